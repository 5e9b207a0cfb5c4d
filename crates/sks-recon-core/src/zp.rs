//! Elements of the SKS prime field.
//!
//! Set reconciliation works on integers modulo `P_SKS`, a 129-bit prime.
//! Key digests (16-byte MD5 values in SKS) are mapped into the field by
//! reading them as little-endian integers after padding to the field's
//! 17-byte width.

use std::fmt;

use crate::error::{CoreError, Result};

// The macro expands to bare `Result<T, E>`; keep the crate alias out of its scope.
mod u192 {
    uint::construct_uint! {
        /// 192-bit unsigned integer backing field arithmetic.
        pub struct U192(3);
    }
}

pub use u192::U192;

/// The SKS field modulus, 530512889551602322505127520352579437339.
pub const P_SKS: U192 = U192([0xc91f_85d9_30a5_431b, 0x8f1d_10e4_878b_1fdf, 0x1]);

/// Byte width of a padded SKS element.
pub const SKS_ZP_NBYTES: usize = 17;

/// Pad a little-endian element encoding with trailing zeros to
/// [`SKS_ZP_NBYTES`]. Longer inputs are returned unchanged.
pub fn pad_sks_element(mut buf: Vec<u8>) -> Vec<u8> {
    if buf.len() < SKS_ZP_NBYTES {
        buf.resize(SKS_ZP_NBYTES, 0);
    }
    buf
}

/// An integer modulo [`P_SKS`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Zp(U192);

impl Zp {
    /// The zero element.
    pub const ZERO: Self = Self(U192([0, 0, 0]));

    /// Build an element from little-endian bytes, reducing modulo `P_SKS`.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let radix = U192::from(256u64);
        let mut acc = U192::zero();
        // Horner from the most significant byte; acc < P keeps acc * 256 in range.
        for &b in bytes.iter().rev() {
            acc = (acc * radix + U192::from(b as u64)) % P_SKS;
        }
        Self(acc)
    }

    /// Decode a hexadecimal key digest into a field element.
    pub fn from_digest(digest: &str) -> Result<Self> {
        let buf = hex::decode(digest).map_err(|source| CoreError::MalformedDigest {
            digest: digest.to_string(),
            source,
        })?;
        Ok(Self::from_le_bytes(&pad_sks_element(buf)))
    }

    /// Build an element from a small integer.
    pub fn from_u64(n: u64) -> Self {
        Self(U192::from(n))
    }

    /// Minimal little-endian encoding, without trailing zero bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = [0u8; 24];
        self.0.to_little_endian(&mut buf);
        let len = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        buf[..len].to_vec()
    }

    /// Little-endian encoding padded to [`SKS_ZP_NBYTES`].
    pub fn to_sks_bytes(&self) -> Vec<u8> {
        pad_sks_element(self.to_bytes())
    }

    /// The padded encoding rendered as a hex digest.
    pub fn to_digest(&self) -> String {
        hex::encode(&self.to_sks_bytes()[..SKS_ZP_NBYTES - 1])
    }

    /// The underlying integer.
    pub fn value(&self) -> U192 {
        self.0
    }
}

impl fmt::Debug for Zp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Zp({})", self.0)
    }
}

impl fmt::Display for Zp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_modulus_value() {
        assert_eq!(
            P_SKS,
            U192::from_dec_str("530512889551602322505127520352579437339").unwrap()
        );
    }

    #[test]
    fn test_u192_parses_alongside_result_alias() {
        let parsed: U192 = "530512889551602322505127520352579437339".parse().unwrap();
        assert_eq!(parsed, P_SKS);
        assert!("not a number".parse::<U192>().is_err());
    }

    #[test]
    fn test_pad_sks_element() {
        assert_eq!(pad_sks_element(vec![1, 2]).len(), SKS_ZP_NBYTES);
        assert_eq!(pad_sks_element(vec![0xff; 20]).len(), 20);
        assert_eq!(pad_sks_element(vec![7])[0], 7);
    }

    #[test]
    fn test_from_digest_little_endian() {
        let z = Zp::from_digest("0100").unwrap();
        assert_eq!(z, Zp::from_u64(1));

        let z = Zp::from_digest("0001").unwrap();
        assert_eq!(z, Zp::from_u64(256));
    }

    #[test]
    fn test_from_digest_rejects_bad_hex() {
        let err = Zp::from_digest("zzzz").unwrap_err();
        assert!(matches!(err, CoreError::MalformedDigest { ref digest, .. } if digest == "zzzz"));

        assert!(Zp::from_digest("abc").is_err());
    }

    #[test]
    fn test_reduction_modulo_p() {
        let mut p_bytes = [0u8; 24];
        P_SKS.to_little_endian(&mut p_bytes);
        assert_eq!(Zp::from_le_bytes(&p_bytes[..SKS_ZP_NBYTES]), Zp::ZERO);

        let p_plus_one = P_SKS + U192::from(1u64);
        let mut buf = [0u8; 24];
        p_plus_one.to_little_endian(&mut buf);
        assert_eq!(Zp::from_le_bytes(&buf), Zp::from_u64(1));
    }

    #[test]
    fn test_zero_encodes_to_full_width() {
        assert!(Zp::ZERO.to_bytes().is_empty());
        assert_eq!(Zp::ZERO.to_sks_bytes(), vec![0u8; SKS_ZP_NBYTES]);
    }

    #[test]
    fn test_md5_digest_roundtrip() {
        let digest = "aabbccddeeff00112233445566778899";
        let z = Zp::from_digest(digest).unwrap();
        assert_eq!(z.to_digest(), digest);
        assert_eq!(z.to_sks_bytes().len(), SKS_ZP_NBYTES);
    }

    proptest! {
        #[test]
        fn digest_roundtrips_to_padded_value(bytes in any::<[u8; 16]>()) {
            let digest = hex::encode(bytes);
            let z = Zp::from_digest(&digest).unwrap();
            let padded = z.to_sks_bytes();
            prop_assert_eq!(padded.len(), SKS_ZP_NBYTES);
            prop_assert_eq!(Zp::from_le_bytes(&padded), z);
            prop_assert_eq!(&padded[..16], &bytes[..]);
        }

        #[test]
        fn elements_are_always_reduced(bytes in prop::collection::vec(any::<u8>(), 0..40)) {
            let z = Zp::from_le_bytes(&bytes);
            prop_assert!(z.value() < P_SKS);
            prop_assert!(z.to_bytes().len() <= SKS_ZP_NBYTES);
        }
    }
}
