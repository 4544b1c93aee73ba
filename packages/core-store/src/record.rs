//! The LegacyRecord type - one decoded credential entry.

use std::fmt;

use bytes::Bytes;

/// One decoded entry of a legacy store.
///
/// All four fields are byte strings: the legacy format never promised UTF-8.
/// Records built by [`crate::decode`] share the key's buffer, so decoding does
/// not copy.
///
/// A record with an empty `authid` is a mechanism marker: it says a mechanism
/// is registered for the realm and carries no credential.
#[derive(Clone, PartialEq, Eq)]
pub struct LegacyRecord {
    authid: Bytes,
    realm: Bytes,
    prop_name: Bytes,
    secret: Bytes,
}

impl LegacyRecord {
    /// Build a record from its fields. No validation is performed.
    pub fn new(
        authid: impl Into<Bytes>,
        realm: impl Into<Bytes>,
        prop_name: impl Into<Bytes>,
        secret: impl Into<Bytes>,
    ) -> Self {
        LegacyRecord {
            authid: authid.into(),
            realm: realm.into(),
            prop_name: prop_name.into(),
            secret: secret.into(),
        }
    }

    pub fn authid(&self) -> &[u8] {
        &self.authid
    }

    pub fn realm(&self) -> &[u8] {
        &self.realm
    }

    pub fn prop_name(&self) -> &[u8] {
        &self.prop_name
    }

    /// The raw value bytes, byte-for-byte, including any NULs.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn is_mechanism_marker(&self) -> bool {
        self.authid.is_empty()
    }

    /// Consume into `(authid, realm, prop_name, secret)`.
    pub fn into_parts(self) -> (Bytes, Bytes, Bytes, Bytes) {
        (self.authid, self.realm, self.prop_name, self.secret)
    }
}

/// Renders `authid@realm (prop_name)`; the secret is never shown.
impl fmt::Display for LegacyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            String::from_utf8_lossy(&self.authid),
            String::from_utf8_lossy(&self.realm),
            String::from_utf8_lossy(&self.prop_name)
        )
    }
}

impl fmt::Debug for LegacyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyRecord")
            .field("authid", &String::from_utf8_lossy(&self.authid))
            .field("realm", &String::from_utf8_lossy(&self.realm))
            .field("prop_name", &String::from_utf8_lossy(&self.prop_name))
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .finish()
    }
}
