use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};

use sasldb_ll_store::{CursorMove, LLCursor, LLEntry, LLError};

use crate::format::{read_frame, HEADER_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Unpositioned,
    /// Positioned on frame `index`; the next frame starts at `next_offset`.
    At { index: u32, next_offset: u64 },
    Exhausted,
}

/// A streaming cursor over a hash file's frames.
///
/// Holds one frame in memory at a time. The frame count comes from the header
/// read at open time; running out of bytes before that count is reached is
/// reported as [`LLError::Corrupt`].
#[derive(Debug)]
pub struct HashFileCursor {
    reader: Option<BufReader<File>>,
    entry_count: u32,
    position: Position,
}

impl HashFileCursor {
    pub(crate) fn new(file: File, entry_count: u32) -> Self {
        HashFileCursor {
            reader: Some(BufReader::new(file)),
            entry_count,
            position: Position::Unpositioned,
        }
    }

    fn read_at(&mut self, index: u32, offset: u64, rewind: bool) -> Result<Option<LLEntry>, LLError> {
        let reader = self.reader.as_mut().ok_or(LLError::Closed)?;
        if index >= self.entry_count {
            self.position = Position::Exhausted;
            return Ok(None);
        }
        if rewind {
            reader.seek(SeekFrom::Start(offset))?;
        }
        let (entry, next_offset) = read_frame(reader, offset)?;
        self.position = Position::At { index, next_offset };
        Ok(Some(entry))
    }
}

impl LLCursor for HashFileCursor {
    fn advance(&mut self, to: CursorMove) -> Result<Option<LLEntry>, LLError> {
        if self.reader.is_none() {
            return Err(LLError::Closed);
        }
        match (to, self.position) {
            (CursorMove::First, _) | (CursorMove::Next, Position::Unpositioned) => {
                self.read_at(0, HEADER_LEN, true)
            }
            (CursorMove::Next, Position::At { index, next_offset }) => {
                self.read_at(index + 1, next_offset, false)
            }
            (CursorMove::Next, Position::Exhausted) => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), LLError> {
        self.reader.take().map(drop).ok_or(LLError::Closed)
    }
}
