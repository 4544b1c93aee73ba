//! Composite keys: `authid NUL realm NUL prop_name`.
//!
//! The property name runs to the end of the key; it is not NUL-terminated.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{KeyError, LegacyRecord};

/// Capacity of the legacy property-name buffer, terminator included.
///
/// A property name of `PROP_NAME_CAPACITY` bytes or more cannot have come from
/// a healthy store and is skipped, never truncated.
pub const PROP_NAME_CAPACITY: usize = 1024;

/// Why an entry was skipped instead of decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The key does not contain exactly two NUL separators.
    WrongNullCount { found: usize },
    /// The property-name segment does not fit [`PROP_NAME_CAPACITY`].
    PropNameTooLong { len: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WrongNullCount { found } => write!(
                f,
                "probable database corruption: key has {} NUL separators, expected 2",
                found
            ),
            SkipReason::PropNameTooLong { len } => write!(
                f,
                "absurdly long prop name: {} bytes (limit {})",
                len,
                PROP_NAME_CAPACITY - 1
            ),
        }
    }
}

/// Decode a raw `(key, value)` entry.
///
/// Pure: no I/O, no allocation beyond reference-count bumps. The record's
/// fields are slices of `key`; its secret is `value`, unmodified.
pub fn decode(key: &Bytes, value: &Bytes) -> Result<LegacyRecord, SkipReason> {
    let mut separators = key
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == 0)
        .map(|(i, _)| i);

    let (first, second) = match (separators.next(), separators.next(), separators.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => {
            return Err(SkipReason::WrongNullCount {
                found: key.iter().filter(|b| **b == 0).count(),
            })
        }
    };

    let tail = key.slice(second + 1..);
    if tail.len() >= PROP_NAME_CAPACITY {
        return Err(SkipReason::PropNameTooLong { len: tail.len() });
    }

    Ok(LegacyRecord::new(
        key.slice(..first),
        key.slice(first + 1..second),
        tail,
        value.clone(),
    ))
}

/// Build the composite key for `(authid, realm, prop_name)`.
///
/// Fails if any field contains a NUL, or if the property name would not fit
/// [`PROP_NAME_CAPACITY`]. Empty fields are allowed; an empty authid is how
/// mechanism markers are stored.
pub fn encode_key(authid: &[u8], realm: &[u8], prop_name: &[u8]) -> Result<Bytes, KeyError> {
    for (field, bytes) in [("authid", authid), ("realm", realm), ("prop_name", prop_name)] {
        if bytes.contains(&0) {
            return Err(KeyError::EmbeddedNul { field });
        }
    }
    if prop_name.len() >= PROP_NAME_CAPACITY {
        return Err(KeyError::PropNameTooLong {
            len: prop_name.len(),
        });
    }

    let mut key = BytesMut::with_capacity(authid.len() + realm.len() + prop_name.len() + 2);
    key.put_slice(authid);
    key.put_u8(0);
    key.put_slice(realm);
    key.put_u8(0);
    key.put_slice(prop_name);
    Ok(key.freeze())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn segment(max: usize) -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(1u8..=255, 0..max)
    }

    proptest! {
        /// Splits happen exactly at the two NULs and the secret is untouched.
        #[test]
        fn prop_decode_splits_at_separators(
            authid in segment(64),
            realm in segment(64),
            prop in segment(PROP_NAME_CAPACITY),
            secret in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut raw = authid.clone();
            raw.push(0);
            raw.extend_from_slice(&realm);
            raw.push(0);
            raw.extend_from_slice(&prop);

            let record = decode(&Bytes::from(raw), &Bytes::from(secret.clone())).unwrap();
            prop_assert_eq!(record.authid(), &authid[..]);
            prop_assert_eq!(record.realm(), &realm[..]);
            prop_assert_eq!(record.prop_name(), &prop[..]);
            prop_assert_eq!(record.secret(), &secret[..]);
        }

        /// Any key without exactly two NULs is skipped, never decoded.
        #[test]
        fn prop_wrong_null_count_is_skipped(raw in proptest::collection::vec(any::<u8>(), 0..128)) {
            let nulls = raw.iter().filter(|b| **b == 0).count();
            prop_assume!(nulls != 2);
            prop_assert_eq!(
                decode(&Bytes::from(raw), &Bytes::new()),
                Err(SkipReason::WrongNullCount { found: nulls })
            );
        }

        /// An oversized tail is skipped whatever it contains.
        #[test]
        fn prop_long_tail_is_skipped(
            extra in 0usize..512,
            fill in 1u8..=255,
        ) {
            let mut raw = b"user\0realm\0".to_vec();
            raw.extend(std::iter::repeat(fill).take(PROP_NAME_CAPACITY + extra));
            let skipped = matches!(
                decode(&Bytes::from(raw), &Bytes::new()),
                Err(SkipReason::PropNameTooLong { .. })
            );
            prop_assert!(skipped);
        }

        /// Encoding then decoding gives back the fields.
        #[test]
        fn prop_encode_decode(
            authid in segment(32),
            realm in segment(32),
            prop in segment(64),
        ) {
            let key = encode_key(&authid, &realm, &prop).unwrap();
            let record = decode(&key, &Bytes::new()).unwrap();
            prop_assert_eq!(record.authid(), &authid[..]);
            prop_assert_eq!(record.realm(), &realm[..]);
            prop_assert_eq!(record.prop_name(), &prop[..]);
        }
    }
}
