//! Core traits for the LL layer.

use std::path::Path;

use bytes::Bytes;

use crate::LLError;

/// A raw `(key, value)` pair as stored by an engine.
///
/// Both halves are `Bytes`, which is reference-counted and supports zero-copy
/// slicing. No validation is performed on either half.
pub type LLEntry = (Bytes, Bytes);

/// Where to move a cursor before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// Position at the engine's first entry (hash-bucket order, not sorted).
    First,
    /// Advance from the current position.
    ///
    /// On a cursor that was never positioned this behaves like `First`.
    Next,
}

/// A stateful position in an engine's entry walk.
///
/// Cursors are strictly sequential. Advancing one from several threads is not
/// supported, and implementations are not required to be `Sync`.
pub trait LLCursor: Send {
    /// Move the cursor and return the entry under it.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(entry))` - The entry at the new position.
    /// * `Ok(None)` - The walk is exhausted (not an error condition). Further
    ///   `Next` moves keep returning `Ok(None)`; an entry is never re-yielded.
    /// * `Err(LLError)` - The engine failed; the walk cannot continue.
    fn advance(&mut self, to: CursorMove) -> Result<Option<LLEntry>, LLError>;

    /// Release the cursor.
    ///
    /// Calling `advance` after `close` returns [`LLError::Closed`].
    fn close(&mut self) -> Result<(), LLError>;
}

/// An open engine handle.
///
/// # Object Safety
///
/// This trait is object-safe: openers hand out `Box<dyn LLTable>`.
pub trait LLTable: Send {
    /// Create a cursor over the table's entries.
    ///
    /// The returned cursor does not borrow the table, but it must be closed
    /// before the table is.
    fn cursor(&mut self) -> Result<Box<dyn LLCursor>, LLError>;

    /// Release the handle.
    fn close(&mut self) -> Result<(), LLError>;
}

/// Opens engine handles from filesystem paths.
pub trait LLOpener {
    /// Open (or create, depending on the engine) the table at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn LLTable>, LLError>;
}

/// Point lookups by raw key.
pub trait LLReader {
    /// Read the value stored under `key`.
    ///
    /// * `Ok(None)` - No such key (not an error condition).
    fn ll_get(&mut self, key: &[u8]) -> Result<Option<Bytes>, LLError>;
}

/// Upserts and deletes by raw key.
pub trait LLWriter {
    /// Insert or replace the value stored under `key`.
    fn ll_put(&mut self, key: &[u8], value: Bytes) -> Result<(), LLError>;

    /// Remove `key`. Returns whether an entry was removed.
    fn ll_delete(&mut self, key: &[u8]) -> Result<bool, LLError>;
}

// Blanket implementations for references and boxes

impl<T: LLCursor + ?Sized> LLCursor for Box<T> {
    fn advance(&mut self, to: CursorMove) -> Result<Option<LLEntry>, LLError> {
        self.as_mut().advance(to)
    }

    fn close(&mut self) -> Result<(), LLError> {
        self.as_mut().close()
    }
}

impl<T: LLTable + ?Sized> LLTable for Box<T> {
    fn cursor(&mut self) -> Result<Box<dyn LLCursor>, LLError> {
        self.as_mut().cursor()
    }

    fn close(&mut self) -> Result<(), LLError> {
        self.as_mut().close()
    }
}

impl<T: LLOpener + ?Sized> LLOpener for &T {
    fn open(&self, path: &Path) -> Result<Box<dyn LLTable>, LLError> {
        (*self).open(path)
    }
}

impl<T: LLReader + ?Sized> LLReader for &mut T {
    fn ll_get(&mut self, key: &[u8]) -> Result<Option<Bytes>, LLError> {
        (*self).ll_get(key)
    }
}

impl<T: LLWriter + ?Sized> LLWriter for &mut T {
    fn ll_put(&mut self, key: &[u8], value: Bytes) -> Result<(), LLError> {
        (*self).ll_put(key, value)
    }

    fn ll_delete(&mut self, key: &[u8]) -> Result<bool, LLError> {
        (*self).ll_delete(key)
    }
}
