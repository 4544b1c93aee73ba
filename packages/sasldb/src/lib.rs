//! The destination credential store.
//!
//! [`SaslDb`] keeps `(authid, realm, prop_name) -> secret` entries under the
//! same composite keys the legacy store used, in an append-only journal from
//! `sasldb-hash-store`. Each write is flushed to disk before it returns;
//! [`SaslDb::compact`] rewrites the file without superseded records.

mod db;
mod error;

pub use db::SaslDb;
pub use error::SaslDbError;
