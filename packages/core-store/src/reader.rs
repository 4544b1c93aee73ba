//! Scoped access to a legacy table: handle, cursor, advance, close.

use std::path::{Path, PathBuf};

use sasldb_ll_store::{CursorMove, LLCursor, LLEntry, LLError, LLOpener, LLTable};

use crate::ReadError;

/// Owns one engine handle and at most one cursor for a single pass.
///
/// Release order is fixed: cursor first, then handle. [`LegacyReader::close`]
/// reports failures of either; dropping an unclosed reader releases both and
/// logs any failure.
pub struct LegacyReader {
    path: PathBuf,
    table: Option<Box<dyn LLTable>>,
    cursor: Option<Box<dyn LLCursor>>,
}

impl LegacyReader {
    /// Open the table at `path` through `opener`.
    pub fn open(opener: &dyn LLOpener, path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        log::debug!("Opening legacy store {}", path.display());
        let table = opener.open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LegacyReader {
            path: path.to_path_buf(),
            table: Some(table),
            cursor: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the pass's cursor. A reader holds one cursor at most.
    pub fn open_cursor(&mut self) -> Result<(), ReadError> {
        if self.cursor.is_some() {
            return Err(ReadError::CursorAlreadyOpen(self.path.clone()));
        }
        let table = self
            .table
            .as_mut()
            .ok_or(ReadError::Cursor(LLError::Closed))?;
        let cursor = table.cursor().map_err(ReadError::Cursor)?;
        self.cursor = Some(cursor);
        Ok(())
    }

    /// Move the cursor and return the raw entry under it.
    ///
    /// `Ok(None)` is end-of-data. Any engine failure is
    /// [`ReadError::Iteration`].
    pub fn advance(&mut self, to: CursorMove) -> Result<Option<LLEntry>, ReadError> {
        let cursor = self.cursor.as_mut().ok_or(ReadError::NoCursor)?;
        cursor.advance(to).map_err(ReadError::Iteration)
    }

    /// Close the cursor (if any) and then the handle.
    ///
    /// Failures are logged and returned; they never undo anything already
    /// read.
    pub fn close(mut self) -> Vec<LLError> {
        self.release()
    }

    fn release(&mut self) -> Vec<LLError> {
        let mut errors = Vec::new();

        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                log::warn!("error closing cursor on {}: {}", self.path.display(), e);
                errors.push(e);
            }
        }

        if let Some(mut table) = self.table.take() {
            log::debug!("Closing legacy store {}", self.path.display());
            if let Err(e) = table.close() {
                log::warn!("error closing sasldb {}: {}", self.path.display(), e);
                errors.push(e);
            }
        }

        errors
    }
}

impl Drop for LegacyReader {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LegacyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyReader")
            .field("path", &self.path)
            .field("open", &self.table.is_some())
            .field("cursor", &self.cursor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasldb_ll_store::{MemoryOpener, MemoryTable};

    const PATH: &str = "/etc/sasldb2";

    fn opener(table: MemoryTable) -> MemoryOpener {
        MemoryOpener::new().with_table(PATH, table)
    }

    fn two_entries() -> MemoryTable {
        MemoryTable::from_entries([
            (b"alice\0r\0p".as_slice(), b"1".as_slice()),
            (b"bob\0r\0p".as_slice(), b"2".as_slice()),
        ])
    }

    #[test]
    fn walks_to_end_of_data() {
        let table = two_entries();
        let stats = table.stats();
        let opener = opener(table);

        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        reader.open_cursor().unwrap();
        assert!(reader.advance(CursorMove::First).unwrap().is_some());
        assert!(reader.advance(CursorMove::Next).unwrap().is_some());
        assert!(reader.advance(CursorMove::Next).unwrap().is_none());

        assert!(reader.close().is_empty());
        assert_eq!(stats.cursors_closed(), 1);
        assert_eq!(stats.tables_closed(), 1);
    }

    #[test]
    fn open_failure_names_path() {
        let opener = MemoryOpener::new();
        let err = LegacyReader::open(&opener, "/nowhere").unwrap_err();
        assert!(matches!(err, ReadError::Open { ref path, .. } if path == Path::new("/nowhere")));
    }

    #[test]
    fn cursor_failure_still_releases_handle() {
        let table = two_entries().fail_cursor();
        let stats = table.stats();
        let opener = opener(table);

        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        assert!(matches!(reader.open_cursor(), Err(ReadError::Cursor(_))));
        drop(reader);
        assert_eq!(stats.tables_closed(), 1);
    }

    #[test]
    fn second_cursor_is_rejected() {
        let opener = opener(two_entries());
        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        reader.open_cursor().unwrap();
        assert!(matches!(
            reader.open_cursor(),
            Err(ReadError::CursorAlreadyOpen(_))
        ));
    }

    #[test]
    fn advance_without_cursor() {
        let opener = opener(two_entries());
        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        assert!(matches!(
            reader.advance(CursorMove::First),
            Err(ReadError::NoCursor)
        ));
    }

    #[test]
    fn engine_failure_is_iteration_error() {
        let opener = opener(two_entries().fail_advance_at(1));
        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        reader.open_cursor().unwrap();
        reader.advance(CursorMove::First).unwrap();
        assert!(matches!(
            reader.advance(CursorMove::Next),
            Err(ReadError::Iteration(_))
        ));
    }

    #[test]
    fn close_reports_both_failures_in_order() {
        let table = two_entries().fail_cursor_close().fail_table_close();
        let stats = table.stats();
        let opener = opener(table);

        let mut reader = LegacyReader::open(&opener, PATH).unwrap();
        reader.open_cursor().unwrap();
        let errors = reader.close();
        assert_eq!(errors.len(), 2);
        assert_eq!(stats.cursors_closed(), 1);
        assert_eq!(stats.tables_closed(), 1);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let table = two_entries();
        let stats = table.stats();
        let opener = opener(table);

        {
            let mut reader = LegacyReader::open(&opener, PATH).unwrap();
            reader.open_cursor().unwrap();
            reader.advance(CursorMove::First).unwrap();
        }
        assert_eq!(stats.cursors_closed(), 1);
        assert_eq!(stats.tables_closed(), 1);
    }
}
