//! Legacy sasldb records: the semantic layer over raw table entries.
//!
//! This layer adds meaning to the raw bytes of the LL layer:
//! - [`LegacyRecord`]: an `(authid, realm, prop_name, secret)` credential
//! - [`decode`]: splits a composite key into its three fields, or explains why
//!   the entry has to be skipped ([`SkipReason`])
//! - [`encode_key`]: the inverse, for stores that write composite keys
//! - [`LegacyReader`]: owns an engine handle and its cursor for one pass
//! - [`CredentialWriter`]: the seam a destination store plugs into
//!
//! # Example
//!
//! ```rust
//! use sasldb_core_store::{decode, Bytes, SkipReason};
//!
//! let key = Bytes::from_static(b"alice\0example.com\0userPassword");
//! let record = decode(&key, &Bytes::from_static(b"s3cret")).unwrap();
//! assert_eq!(record.authid(), b"alice");
//! assert_eq!(record.realm(), b"example.com");
//! assert_eq!(record.prop_name(), b"userPassword");
//!
//! let corrupt = Bytes::from_static(b"bob\0\0tooNull\0extra");
//! assert_eq!(
//!     decode(&corrupt, &Bytes::new()),
//!     Err(SkipReason::WrongNullCount { found: 3 })
//! );
//! ```

pub use bytes::Bytes;

mod error;
mod key;
mod reader;
mod record;
mod writer;

pub use error::{KeyError, ReadError, WriteError};
pub use key::{decode, encode_key, SkipReason, PROP_NAME_CAPACITY};
pub use reader::LegacyReader;
pub use record::LegacyRecord;
pub use writer::CredentialWriter;

// Re-export LL types for convenience
pub use sasldb_ll_store::{CursorMove, LLCursor, LLEntry, LLError, LLOpener, LLTable};
