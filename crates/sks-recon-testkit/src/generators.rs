//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sks_recon_core::{ChangeKind, KeyChange, Zp};

/// Generate a 16-byte hex digest, like the key store reports.
pub fn digest() -> impl Strategy<Value = String> {
    any::<[u8; 16]>().prop_map(hex::encode)
}

/// Generate a hex digest of any length up to the padded element width.
pub fn short_digest() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..=17).prop_map(hex::encode)
}

/// Generate a string that is not valid hex.
pub fn malformed_digest() -> impl Strategy<Value = String> {
    "[g-z]{1,32}".prop_map(String::from)
}

/// Generate a field element from a digest.
pub fn zp() -> impl Strategy<Value = Zp> {
    any::<[u8; 16]>().prop_map(|bytes| Zp::from_le_bytes(&bytes))
}

/// Generate a list of distinct elements.
pub fn distinct_zps(max_len: usize) -> impl Strategy<Value = Vec<Zp>> {
    prop::collection::btree_set(zp(), 0..=max_len).prop_map(|set| set.into_iter().collect())
}

/// Generate non-empty key material of at most `max_len` bytes.
pub fn key_material(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// Generate a change kind.
pub fn change_kind() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![Just(ChangeKind::Added), Just(ChangeKind::Replaced)]
}

/// Generate a well-formed key change.
pub fn key_change() -> impl Strategy<Value = KeyChange> {
    prop_oneof![
        digest().prop_map(KeyChange::added),
        (digest(), digest()).prop_map(|(old, new)| KeyChange::replaced(old, new)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn digest_maps_to_element_and_back(d in digest()) {
            let z = Zp::from_digest(&d).unwrap();
            prop_assert_eq!(z.to_digest(), d);
        }

        #[test]
        fn short_digests_always_convert(d in short_digest()) {
            prop_assert!(Zp::from_digest(&d).is_ok());
        }

        #[test]
        fn malformed_digests_rejected(d in malformed_digest()) {
            prop_assert!(Zp::from_digest(&d).is_err());
        }

        #[test]
        fn key_changes_carry_one_insert(change in key_change()) {
            prop_assert_eq!(change.insert_digests().len(), 1);
            match change.kind {
                ChangeKind::Added => {
                    prop_assert!(change.remove_digests().is_empty());
                }
                ChangeKind::Replaced => {
                    prop_assert_eq!(change.remove_digests().len(), 1);
                }
            }
        }
    }
}
