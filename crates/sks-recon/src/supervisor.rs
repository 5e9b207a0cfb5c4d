//! Supervised background tasks sharing one cancellation token.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{PeerError, Result};

/// A set of named tasks that are cancelled and joined together.
///
/// A task that returns an error cancels the whole group.
pub struct TaskGroup {
    token: CancellationToken,
    tasks: JoinSet<(&'static str, Result<()>)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Token observed by every task in the group.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn `task` on the current runtime.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.token.clone();
        debug!(task = name, "spawning");
        self.tasks.spawn(async move {
            let result = task.await;
            if result.is_err() {
                token.cancel();
            }
            (name, result)
        });
    }

    /// Cancel every task and wait for all of them to finish.
    ///
    /// Returns the first task error; later errors are logged.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.token.cancel();

        let mut first = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok((name, Ok(()))) => {
                    debug!(task = name, "stopped");
                    continue;
                }
                Ok((name, Err(e))) => {
                    error!(task = name, error = %e, "task failed");
                    e
                }
                Err(e) => {
                    error!(error = %e, "task did not complete");
                    PeerError::Task {
                        name: "unknown",
                        reason: e.to_string(),
                    }
                }
            };
            first.get_or_insert(outcome);
        }

        first.map_or(Ok(()), Err)
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}
