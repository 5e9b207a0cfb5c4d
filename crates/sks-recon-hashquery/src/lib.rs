//! # SKS Recon HashQuery
//!
//! The binary exchange a recon peer uses to fetch full key material for
//! elements it learned it is missing.
//!
//! ## Message Flow
//!
//! ```text
//! Local peer                                   Remote HKP server
//!   |-- POST /pks/hashquery (sks/hashquery) -->|
//!   |     count, (len, element)*               |
//!   |<------------- 200 OK --------------------|
//!   |     nkeys, (len, key material)*, CRLF    |
//! ```
//!
//! Elements on this wire are 16 bytes: the 17-byte padded field element
//! with its final byte dropped. Counts and lengths are 4-byte big-endian
//! integers.
//!
//! ## Key Types
//!
//! - [`HashQueryClient`] - Encodes a request, posts it and checks the status
//! - [`ResponseReader`] - Incremental reader over a buffered response body
//! - [`HashQueryTransport`] - The HTTP seam, with [`HttpTransport`] over
//!   reqwest and [`MemoryTransport`] for tests

pub mod client;
pub mod codec;
pub mod error;
pub mod transport;

pub use client::HashQueryClient;
pub use codec::{
    decode_request, encode_request, encode_response, ResponseReader, CONTENT_TYPE,
    HASHQUERY_ELEMENT_LEN, HASHQUERY_PATH, RESPONSE_TRAILER,
};
pub use error::{HashQueryError, Result};
pub use transport::{
    http::HttpTransport, memory::MemoryTransport, memory::RecordedRequest, HashQueryTransport,
    TransportResponse,
};
