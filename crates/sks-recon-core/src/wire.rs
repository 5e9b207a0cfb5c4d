//! Length-prefix integers used on the SKS wire.
//!
//! Every count and length is a 4-byte big-endian unsigned integer.

use bytes::{Buf, BufMut};

use crate::error::{CoreError, Result};

/// Width of an encoded wire integer.
pub const INT_LEN: usize = 4;

/// Append `n` as a wire integer.
pub fn write_int<B: BufMut>(buf: &mut B, n: usize) -> Result<()> {
    let n = u32::try_from(n).map_err(|_| CoreError::LengthOverflow(n))?;
    buf.put_u32(n);
    Ok(())
}

/// Read a wire integer, failing if fewer than four bytes remain.
pub fn read_int<B: Buf>(buf: &mut B) -> Result<usize> {
    if buf.remaining() < INT_LEN {
        return Err(CoreError::Truncated {
            needed: INT_LEN,
            available: buf.remaining(),
        });
    }
    Ok(buf.get_u32() as usize)
}
