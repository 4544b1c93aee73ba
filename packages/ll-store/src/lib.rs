//! Low-level key/value table traits.
//!
//! This is the narrow waist of the migration stack. Everything at this level is
//! pure bytes - no composite-key parsing, no credential semantics, no file
//! layout knowledge.
//!
//! A source engine is modelled as a capability:
//!
//! - [`LLOpener`] turns a filesystem path into an open [`LLTable`] handle
//! - [`LLTable`] hands out a stateful [`LLCursor`] and is closed exactly once
//! - [`LLCursor`] is advanced with [`CursorMove::First`] / [`CursorMove::Next`]
//!   and yields raw `(key, value)` pairs until it reports end-of-data
//!
//! Point lookups and writes go through [`LLReader`] and [`LLWriter`].
//!
//! # Example
//!
//! ```rust
//! use sasldb_ll_store::{CursorMove, LLCursor, LLError, LLTable, MemoryTable};
//!
//! fn count_entries(table: &mut dyn LLTable) -> Result<usize, LLError> {
//!     let mut cursor = table.cursor()?;
//!     let mut n = 0;
//!     let mut step = CursorMove::First;
//!     while cursor.advance(step)?.is_some() {
//!         n += 1;
//!         step = CursorMove::Next;
//!     }
//!     cursor.close()?;
//!     Ok(n)
//! }
//!
//! let mut table = MemoryTable::from_entries([(b"a".as_slice(), b"1".as_slice())]);
//! assert_eq!(count_entries(&mut table).unwrap(), 1);
//! ```

pub use bytes::Bytes;

mod error;
pub mod memory;
mod traits;

pub use error::LLError;
pub use memory::{MemoryOpener, MemoryStats, MemoryTable};
pub use traits::{CursorMove, LLCursor, LLEntry, LLOpener, LLReader, LLTable, LLWriter};
