//! Hashquery client.

use std::sync::Arc;

use sks_recon_core::Zp;
use tracing::debug;

use crate::codec::{encode_request, ResponseReader, CONTENT_TYPE, HASHQUERY_PATH};
use crate::error::{HashQueryError, Result};
use crate::transport::HashQueryTransport;

/// Issues hashquery requests to remote HKP servers.
pub struct HashQueryClient<T: HashQueryTransport> {
    transport: Arc<T>,
}

impl<T: HashQueryTransport> HashQueryClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Request the key material for `elements` from the HKP server at
    /// `remote_addr` (`host:port`).
    ///
    /// Returns a reader over the buffered response; the caller drains it.
    pub async fn query(&self, remote_addr: &str, elements: &[Zp]) -> Result<ResponseReader> {
        let body = encode_request(elements)?;
        let url = format!("http://{}{}", remote_addr, HASHQUERY_PATH);

        let response = self.transport.post(&url, CONTENT_TYPE, body).await?;
        if response.status != 200 {
            return Err(HashQueryError::BadStatus {
                addr: remote_addr.to_string(),
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let reader = ResponseReader::new(response.body)?;
        debug!(
            remote = remote_addr,
            requested = elements.len(),
            nkeys = reader.key_count(),
            "hashquery response"
        );
        Ok(reader)
    }
}

impl<T: HashQueryTransport> Clone for HashQueryClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryTransport;
    use crate::transport::TransportResponse;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_query_posts_to_hashquery_path() {
        let transport = Arc::new(MemoryTransport::new(|_| {
            Ok(TransportResponse {
                status: 200,
                body: crate::codec::encode_response(&[b"key".as_ref()]).unwrap(),
            })
        }));
        let client = HashQueryClient::new(Arc::clone(&transport));

        let mut reader = client
            .query("192.0.2.1:11371", &[Zp::from_u64(1), Zp::from_u64(2)])
            .await
            .unwrap();
        assert_eq!(reader.next_key().unwrap().unwrap().as_ref(), b"key");

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://192.0.2.1:11371/pks/hashquery");
        assert_eq!(requests[0].content_type, "sks/hashquery");
        assert_eq!(requests[0].elements().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_200_carries_body() {
        let transport = Arc::new(MemoryTransport::new(|_| {
            Ok(TransportResponse {
                status: 503,
                body: Bytes::from_static(b"overloaded"),
            })
        }));
        let client = HashQueryClient::new(transport);

        let err = client.query("h:1", &[Zp::from_u64(1)]).await.unwrap_err();
        match err {
            HashQueryError::BadStatus { addr, status, body } => {
                assert_eq!(addr, "h:1");
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected BadStatus, got {:?}", other),
        }
    }
}
