//! SQLite-backed prefix tree.
//!
//! Stores the element set in `<path>/ptree.db`, so the set (and therefore
//! the element count the peer trusts at startup) survives restarts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use sks_recon_core::Zp;

use crate::error::{EngineError, Result};
use crate::local::LocalEngine;
use crate::migration;
use crate::settings::{PTreeConfig, Settings};
use crate::traits::{PrefixTree, ReconBackend, RootSummary};

/// File name of the tree database inside the tree directory.
pub const TREE_DB_FILE: &str = "ptree.db";

/// SQLite prefix tree.
///
/// Thread-safe via internal Mutex. `close` drops the connection; every later
/// call fails with [`EngineError::Closed`].
pub struct SqlitePrefixTree {
    path: PathBuf,
    config: PTreeConfig,
    conn: Mutex<Option<Connection>>,
}

impl SqlitePrefixTree {
    /// Open the tree database under the directory `path`.
    ///
    /// The schema is not created until [`PrefixTree::create`] is called.
    pub fn open(path: impl AsRef<Path>, config: PTreeConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path.join(TREE_DB_FILE))?;
        Ok(Self {
            path,
            config,
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &PTreeConfig {
        &self.config
    }

    /// All elements, ordered by their stored encoding.
    pub fn elements(&self) -> Result<Vec<Zp>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT element FROM elements ORDER BY element")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(Zp::from_le_bytes(&row?));
            }
            Ok(out)
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| EngineError::InvalidData(format!("connection mutex poisoned: {}", e)))?;
        let conn = guard.as_mut().ok_or(EngineError::Closed)?;
        f(conn)
    }
}

impl PrefixTree for SqlitePrefixTree {
    fn create(&self) -> Result<()> {
        let config = self.config;
        self.with_conn(|conn| {
            migration::migrate(conn)?;
            check_config(conn, &config)
        })
    }

    fn insert(&self, z: &Zp) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO elements (element, inserted_at) VALUES (?1, strftime('%s','now'))",
                params![z.to_sks_bytes()],
            )?;
            Ok(())
        })
    }

    fn remove(&self, z: &Zp) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM elements WHERE element = ?1", params![z.to_sks_bytes()])?;
            Ok(())
        })
    }

    fn root(&self) -> Result<RootSummary> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))?;
            let size = usize::try_from(count)
                .map_err(|_| EngineError::InvalidData(format!("negative element count {}", count)))?;
            Ok(RootSummary::new(size))
        })
    }

    fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::InvalidData(format!("connection mutex poisoned: {}", e)))?
            .take()
            .ok_or(EngineError::Closed)?;
        conn.close().map_err(|(_, e)| EngineError::Database(e))
    }
}

/// Record the tree shape on first create; refuse a different one later.
fn check_config(conn: &Connection, config: &PTreeConfig) -> Result<()> {
    let stored = conn
        .query_row(
            "SELECT thresh_mult, bit_quantum, mbar FROM tree_config WHERE id = 1",
            [],
            |row| {
                Ok(PTreeConfig {
                    thresh_mult: row.get(0)?,
                    bit_quantum: row.get(1)?,
                    mbar: row.get(2)?,
                })
            },
        )
        .optional()?;

    match stored {
        Some(stored) if stored == *config => Ok(()),
        Some(stored) => Err(EngineError::Config(format!(
            "tree was built with {:?}, opened with {:?}",
            stored, config
        ))),
        None => {
            conn.execute(
                "INSERT INTO tree_config (id, thresh_mult, bit_quantum, mbar) VALUES (1, ?1, ?2, ?3)",
                params![config.thresh_mult, config.bit_quantum, config.mbar],
            )?;
            Ok(())
        }
    }
}

/// Backend producing SQLite trees and local engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl ReconBackend for SqliteBackend {
    type Tree = SqlitePrefixTree;
    type Engine = LocalEngine<SqlitePrefixTree>;

    fn open_tree(&self, config: &PTreeConfig, path: &Path) -> Result<Self::Tree> {
        SqlitePrefixTree::open(path, *config)
    }

    fn new_engine(&self, settings: &Settings, tree: Arc<Self::Tree>) -> Self::Engine {
        LocalEngine::new(settings, tree)
    }
}
