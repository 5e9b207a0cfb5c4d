//! Hashquery request and response framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use sks_recon_core::{read_int, write_int, CoreError, Zp, SKS_ZP_NBYTES};
use tracing::debug;

use crate::error::Result;

/// Request path on the remote HKP server.
pub const HASHQUERY_PATH: &str = "/pks/hashquery";

/// Content type of hashquery requests.
pub const CONTENT_TYPE: &str = "sks/hashquery";

/// Element width on the hashquery wire, one byte narrower than a padded
/// field element.
pub const HASHQUERY_ELEMENT_LEN: usize = SKS_ZP_NBYTES - 1;

/// Bytes that terminate a response after the last key.
pub const RESPONSE_TRAILER: &[u8; 2] = b"\r\n";

/// Hashquery wire bytes for one element.
fn element_bytes(z: &Zp) -> Vec<u8> {
    let mut zb = z.to_sks_bytes();
    zb.truncate(zb.len() - 1);
    zb
}

/// Encode a hashquery request for `elements`.
pub fn encode_request(elements: &[Zp]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(4 + elements.len() * (4 + HASHQUERY_ELEMENT_LEN));
    write_int(&mut buf, elements.len())?;
    for z in elements {
        let zb = element_bytes(z);
        write_int(&mut buf, zb.len())?;
        buf.put_slice(&zb);
    }
    Ok(buf.freeze())
}

/// Decode a hashquery request body into elements.
pub fn decode_request(mut body: Bytes) -> Result<Vec<Zp>> {
    let count = read_int(&mut body)?;
    let mut elements = Vec::with_capacity(count.min(body.remaining() / 4));
    for _ in 0..count {
        let chunk = read_chunk(&mut body)?;
        elements.push(Zp::from_le_bytes(&chunk));
    }
    Ok(elements)
}

/// Encode a hashquery response carrying `keys`, including the trailer.
pub fn encode_response<K: AsRef<[u8]>>(keys: &[K]) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    write_int(&mut buf, keys.len())?;
    for key in keys {
        let key = key.as_ref();
        write_int(&mut buf, key.len())?;
        buf.put_slice(key);
    }
    buf.put_slice(RESPONSE_TRAILER);
    Ok(buf.freeze())
}

fn read_chunk(body: &mut Bytes) -> Result<Bytes> {
    let len = read_int(body)?;
    if body.remaining() < len {
        return Err(CoreError::Truncated {
            needed: len,
            available: body.remaining(),
        }
        .into());
    }
    Ok(body.split_to(len))
}

/// Reader over a fully buffered hashquery response.
///
/// Keys are yielded one at a time so each can be merged before the next
/// is decoded.
#[derive(Debug)]
pub struct ResponseReader {
    body: Bytes,
    key_count: usize,
    read: usize,
}

impl ResponseReader {
    /// Parse the key count at the head of `body`.
    pub fn new(mut body: Bytes) -> Result<Self> {
        let key_count = read_int(&mut body)?;
        Ok(Self {
            body,
            key_count,
            read: 0,
        })
    }

    /// Number of keys the remote announced.
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Number of keys read so far.
    pub fn keys_read(&self) -> usize {
        self.read
    }

    /// The next key, or `None` once all announced keys have been read.
    pub fn next_key(&mut self) -> Result<Option<Bytes>> {
        if self.read == self.key_count {
            return Ok(None);
        }
        let key = read_chunk(&mut self.body)?;
        self.read += 1;
        Ok(Some(key))
    }

    /// Discard the two-byte trailer.
    ///
    /// The trailer's content is not validated; a short or unexpected
    /// trailer is only logged.
    pub fn finish(mut self) {
        let n = self.body.remaining().min(RESPONSE_TRAILER.len());
        let trailer = self.body.split_to(n);
        if trailer.as_ref() != RESPONSE_TRAILER {
            debug!(trailer = ?trailer, "unexpected hashquery response trailer");
        }
        if self.body.has_remaining() {
            debug!(extra = self.body.remaining(), "ignoring bytes after hashquery response trailer");
        }
    }
}
