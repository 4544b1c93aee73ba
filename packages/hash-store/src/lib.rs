//! On-disk hash-table engine.
//!
//! A hash file is a small header followed by length-prefixed `(key, value)`
//! frames grouped by hash bucket:
//!
//! ```text
//! +------+---------+--------------+-------------+
//! | SDBH | version | bucket_count | entry_count |   16 byte header, little endian
//! +------+---------+--------------+-------------+
//! | key_len | value_len | key ... | value ... |   entry_count frames, bucket order
//! +---------+-----------+---------+-----------+
//! ```
//!
//! Reading goes through [`HashFile`], whose cursors stream frames from disk
//! one at a time. Writing goes through [`HashTable`], an in-memory table that
//! is persisted atomically.
//!
//! [`Journal`] is the write-through counterpart: an append-only log of the
//! same frames, synced on every write.
//!
//! # Example
//!
//! ```rust
//! use sasldb_hash_store::{HashFile, HashTable};
//! use sasldb_ll_store::{Bytes, CursorMove, LLCursor, LLTable, LLWriter};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("sasldb2");
//!
//! let mut table = HashTable::new();
//! table.ll_put(b"alice\0example.com\0userPassword", Bytes::from_static(b"pw")).unwrap();
//! table.persist(&path).unwrap();
//!
//! let mut file = HashFile::open(&path).unwrap();
//! let mut cursor = file.cursor().unwrap();
//! let (key, value) = cursor.advance(CursorMove::First).unwrap().unwrap();
//! assert_eq!(&value[..], b"pw");
//! assert!(cursor.advance(CursorMove::Next).unwrap().is_none());
//! # let _ = key;
//! ```

mod cursor;
mod file;
pub mod format;
mod journal;
mod table;

pub use cursor::HashFileCursor;
pub use file::{HashFile, HashFileOpener, OpenMode};
pub use journal::{Journal, JournalOp, JOURNAL_HEADER_LEN};
pub use table::HashTable;
