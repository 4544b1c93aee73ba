//! In-memory tables.
//!
//! `MemoryTable` keeps its entries in insertion order and walks them in that
//! order. It can be told to fail at chosen points, which makes it the engine
//! of choice for exercising reader and driver error paths without touching
//! the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::{CursorMove, LLCursor, LLEntry, LLError, LLOpener, LLTable};

/// Counters shared between a table, its cursors and the test observing them.
#[derive(Debug, Default)]
pub struct MemoryStats {
    cursors_opened: AtomicUsize,
    cursors_closed: AtomicUsize,
    tables_closed: AtomicUsize,
    advances: AtomicUsize,
}

impl MemoryStats {
    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::SeqCst)
    }

    pub fn tables_closed(&self) -> usize {
        self.tables_closed.load(Ordering::SeqCst)
    }

    /// Number of `advance` calls made on any cursor, including failing ones.
    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }
}

/// Injected failure points.
#[derive(Debug, Clone, Default)]
struct Faults {
    /// Yield an error instead of the entry at this index.
    advance_at: Option<usize>,
    cursor: bool,
    cursor_close: bool,
    table_close: bool,
}

/// A table held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    entries: Arc<Vec<LLEntry>>,
    faults: Faults,
    stats: Arc<MemoryStats>,
    closed: bool,
}

impl MemoryTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty::<(&[u8], &[u8])>())
    }

    /// Create a table holding `entries` in the given order.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| {
                (
                    Bytes::copy_from_slice(k.as_ref()),
                    Bytes::copy_from_slice(v.as_ref()),
                )
            })
            .collect();
        Self {
            entries: Arc::new(entries),
            faults: Faults::default(),
            stats: Arc::new(MemoryStats::default()),
            closed: false,
        }
    }

    /// Make the cursor fail when it would yield the entry at `index`.
    ///
    /// An index equal to the entry count fails instead of reporting
    /// end-of-data.
    pub fn fail_advance_at(mut self, index: usize) -> Self {
        self.faults.advance_at = Some(index);
        self
    }

    /// Make cursor creation fail.
    pub fn fail_cursor(mut self) -> Self {
        self.faults.cursor = true;
        self
    }

    /// Make closing the cursor fail.
    pub fn fail_cursor_close(mut self) -> Self {
        self.faults.cursor_close = true;
        self
    }

    /// Make closing the table fail.
    pub fn fail_table_close(mut self) -> Self {
        self.faults.table_close = true;
        self
    }

    /// Counters observing this table and its cursors.
    pub fn stats(&self) -> Arc<MemoryStats> {
        Arc::clone(&self.stats)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(what: &str) -> LLError {
    LLError::Transport(format!("injected {} failure", what).into())
}

impl LLTable for MemoryTable {
    fn cursor(&mut self) -> Result<Box<dyn LLCursor>, LLError> {
        if self.closed {
            return Err(LLError::Closed);
        }
        if self.faults.cursor {
            return Err(injected("cursor"));
        }
        self.stats.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            entries: Arc::clone(&self.entries),
            position: Position::Unpositioned,
            fail_at: self.faults.advance_at,
            fail_close: self.faults.cursor_close,
            stats: Arc::clone(&self.stats),
            closed: false,
        }))
    }

    fn close(&mut self) -> Result<(), LLError> {
        if self.closed {
            return Err(LLError::Closed);
        }
        self.closed = true;
        self.stats.tables_closed.fetch_add(1, Ordering::SeqCst);
        if self.faults.table_close {
            return Err(injected("table close"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Unpositioned,
    At(usize),
    Exhausted,
}

struct MemoryCursor {
    entries: Arc<Vec<LLEntry>>,
    position: Position,
    fail_at: Option<usize>,
    fail_close: bool,
    stats: Arc<MemoryStats>,
    closed: bool,
}

impl LLCursor for MemoryCursor {
    fn advance(&mut self, to: CursorMove) -> Result<Option<LLEntry>, LLError> {
        if self.closed {
            return Err(LLError::Closed);
        }
        self.stats.advances.fetch_add(1, Ordering::SeqCst);

        let index = match (to, self.position) {
            (CursorMove::First, _) | (CursorMove::Next, Position::Unpositioned) => 0,
            (CursorMove::Next, Position::At(i)) => i + 1,
            (CursorMove::Next, Position::Exhausted) => return Ok(None),
        };

        if self.fail_at == Some(index) {
            return Err(injected("advance"));
        }

        match self.entries.get(index) {
            Some(entry) => {
                self.position = Position::At(index);
                Ok(Some(entry.clone()))
            }
            None => {
                self.position = Position::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<(), LLError> {
        if self.closed {
            return Err(LLError::Closed);
        }
        self.closed = true;
        self.stats.cursors_closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(injected("cursor close"));
        }
        Ok(())
    }
}

/// An opener that serves registered in-memory tables by path.
///
/// Opening an unregistered path fails, mirroring an engine that cannot open
/// the file.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    tables: Mutex<HashMap<PathBuf, MemoryTable>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` under `path`, returning the opener for chaining.
    pub fn with_table(self, path: impl Into<PathBuf>, table: MemoryTable) -> Self {
        self.insert(path, table);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, table: MemoryTable) {
        self.tables().insert(path.into(), table);
    }

    // The map holds no invariant a panicking holder could break.
    fn tables(&self) -> MutexGuard<'_, HashMap<PathBuf, MemoryTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LLOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn LLTable>, LLError> {
        match self.tables().get(path) {
            Some(table) => Ok(Box::new(table.clone())),
            None => Err(LLError::from(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory table registered at {}", path.display()),
            ))),
        }
    }
}
