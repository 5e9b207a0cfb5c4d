//! Transport abstraction for hashquery requests.
//!
//! The client needs exactly one operation: POST a body and get back the
//! status and the fully buffered response body.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Transport trait for posting hashquery requests.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait HashQueryTransport: Send + Sync {
    /// POST `body` to `url` and buffer the whole response body.
    async fn post(&self, url: &str, content_type: &str, body: Bytes) -> Result<TransportResponse>;
}

/// HTTP transport over reqwest.
pub mod http {
    use super::*;
    use std::time::Duration;

    use reqwest::header::CONTENT_TYPE;

    /// HTTP transport.
    ///
    /// Without a timeout, requests rely on the connection defaults of the
    /// underlying client.
    #[derive(Debug, Clone, Default)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Transport whose requests fail after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HashQueryTransport for HttpTransport {
        async fn post(&self, url: &str, content_type: &str, body: Bytes) -> Result<TransportResponse> {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .await?;

            let status = response.status().as_u16();
            // Buffer everything before the caller starts merging keys.
            let body = response.bytes().await?;
            Ok(TransportResponse { status, body })
        }
    }
}

/// An in-memory transport for testing.
///
/// Requests are recorded in order and answered by a responder closure.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use sks_recon_core::Zp;

    use crate::codec::{decode_request, encode_response, HASHQUERY_PATH};
    use crate::error::HashQueryError;

    /// A request seen by the memory transport.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub url: String,
        pub content_type: String,
        pub body: Bytes,
    }

    impl RecordedRequest {
        /// Elements carried by the request body.
        pub fn elements(&self) -> Result<Vec<Zp>> {
            decode_request(self.body.clone())
        }
    }

    type Responder = Box<dyn Fn(&RecordedRequest) -> Result<TransportResponse> + Send + Sync>;

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        requests: Mutex<Vec<RecordedRequest>>,
        responder: Responder,
    }

    impl MemoryTransport {
        pub fn new<F>(responder: F) -> Self
        where
            F: Fn(&RecordedRequest) -> Result<TransportResponse> + Send + Sync + 'static,
        {
            Self {
                requests: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            }
        }

        /// A transport answering like an HKP server holding `keys`.
        ///
        /// Each requested element present in `keys` is returned; unknown
        /// elements are skipped.
        pub fn with_keys(keys: HashMap<Zp, Bytes>) -> Self {
            Self::new(move |request| {
                if !request.url.ends_with(HASHQUERY_PATH) {
                    return Ok(TransportResponse {
                        status: 404,
                        body: Bytes::from_static(b"not found"),
                    });
                }
                let found: Vec<Bytes> = request
                    .elements()?
                    .iter()
                    .filter_map(|z| keys.get(z).cloned())
                    .collect();
                Ok(TransportResponse {
                    status: 200,
                    body: encode_response(&found)?,
                })
            })
        }

        /// All requests seen so far, in order.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl HashQueryTransport for MemoryTransport {
        async fn post(&self, url: &str, content_type: &str, body: Bytes) -> Result<TransportResponse> {
            let request = RecordedRequest {
                url: url.to_string(),
                content_type: content_type.to_string(),
                body,
            };
            self.requests
                .lock()
                .map_err(|e| HashQueryError::Transport(format!("request log poisoned: {}", e)))?
                .push(request.clone());
            (self.responder)(&request)
        }
    }
}
