//! Append-only journal of puts and deletes.
//!
//! ```text
//! +------+---------+
//! | SDBJ | version |                                  8 byte header
//! +------+---------+
//! | tag | key_len | value_len | key ... | value ... |   one record per write
//! +-----+---------+-----------+---------+-----------+
//! ```
//!
//! Every append is synced before it returns, so a successful write survives
//! a crash. Reads replay the file from disk; the last record for a key wins.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sasldb_ll_store::{LLError, LLReader, LLWriter};

use crate::file::{append_new_options, remove_stale_temp, sibling_temp_path, truncate_options};
use crate::format::{read_frame, write_frame};

pub const JOURNAL_MAGIC: [u8; 4] = *b"SDBJ";
pub const JOURNAL_VERSION: u32 = 1;
pub const JOURNAL_HEADER_LEN: u64 = 8;

const TAG_PUT: u8 = 1;
const TAG_DELETE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalOp {
    Put,
    Delete,
}

/// A write-through key/value journal.
///
/// Nothing is created on disk until the first write or [`Journal::sync`].
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    /// Append handle, opened on first write.
    file: Option<File>,
    /// End of the last complete record; 0 while the file does not exist.
    len: u64,
}

struct ScanError {
    good_end: u64,
    error: LLError,
}

impl Journal {
    /// Open the journal at `path`.
    ///
    /// A damaged tail, left by a write that never completed, is cut back to
    /// the last complete record.
    pub fn open(path: impl AsRef<Path>) -> Result<Journal, LLError> {
        let path = path.as_ref().to_path_buf();
        if !path.try_exists()? {
            log::debug!("{} does not exist yet", path.display());
            return Ok(Journal {
                path,
                file: None,
                len: 0,
            });
        }

        let mut reader = BufReader::new(File::open(&path)?);
        read_header(&mut reader)?;
        let len = match scan(&mut reader, |_, _, _| {}) {
            Ok(end) => end,
            Err(ScanError {
                good_end,
                error: error @ LLError::Corrupt { .. },
            }) => {
                log::warn!(
                    "{}: dropping damaged tail after offset {}: {}",
                    path.display(),
                    good_end,
                    error
                );
                let file = OpenOptions::new().write(true).open(&path)?;
                file.set_len(good_end)?;
                file.sync_all()?;
                good_end
            }
            Err(ScanError { error, .. }) => return Err(error),
        };

        log::debug!("Opened journal {} ({} bytes)", path.display(), len);
        Ok(Journal {
            path,
            file: None,
            len,
        })
    }

    /// Check that the journal at `path` is complete and readable, without
    /// changing it.
    pub fn verify(path: impl AsRef<Path>) -> Result<u64, LLError> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        read_header(&mut reader)?;
        scan(&mut reader, |_, _, _| {}).map_err(|e| e.error)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the journal file exists.
    pub fn is_created(&self) -> bool {
        self.len > 0
    }

    /// Feed every record to `visit`, oldest first.
    pub fn replay(&self, mut visit: impl FnMut(JournalOp, Bytes, Bytes)) -> Result<(), LLError> {
        if !self.is_created() {
            return Ok(());
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        read_header(&mut reader)?;
        let mut records = reader.take(self.len - JOURNAL_HEADER_LEN);
        scan(&mut records, |op, key, value| visit(op, key, value)).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, LLError> {
        let mut found = None;
        self.replay(|op, k, value| {
            if k == key {
                found = match op {
                    JournalOp::Put => Some(value),
                    JournalOp::Delete => None,
                };
            }
        })?;
        Ok(found)
    }

    /// The entries that are live after replaying every record, in key order.
    pub fn live_entries(&self) -> Result<BTreeMap<Bytes, Bytes>, LLError> {
        let mut live = BTreeMap::new();
        self.replay(|op, key, value| match op {
            JournalOp::Put => {
                live.insert(key, value);
            }
            JournalOp::Delete => {
                live.remove(&key);
            }
        })?;
        Ok(live)
    }

    pub fn append(&mut self, op: JournalOp, key: &[u8], value: &[u8]) -> Result<(), LLError> {
        let mut record = Vec::with_capacity(9 + key.len() + value.len());
        record.push(match op {
            JournalOp::Put => TAG_PUT,
            JournalOp::Delete => TAG_DELETE,
        });
        write_frame(&mut record, key, value)?;

        let (file, good_end) = self.writer()?;
        if let Err(e) = file.write_all(&record).and_then(|()| file.sync_data()) {
            // Cut the partial record so later appends stay readable.
            if let Err(trunc) = file.set_len(good_end) {
                log::warn!("could not trim failed append: {}", trunc);
            }
            return Err(e.into());
        }
        self.len = good_end + record.len() as u64;
        Ok(())
    }

    /// Make sure the journal exists on disk and everything written is durable.
    pub fn sync(&mut self) -> Result<(), LLError> {
        let (file, _) = self.writer()?;
        file.sync_all()?;
        Ok(())
    }

    /// Rewrite the journal with only its live entries.
    ///
    /// Compaction holds the live entries in memory; appends never do.
    /// Returns the number of entries kept.
    pub fn compact(&mut self) -> Result<usize, LLError> {
        if !self.is_created() {
            return Ok(0);
        }
        let live = self.live_entries()?;
        let temp = sibling_temp_path(&self.path);
        log::debug!(
            "Compacting {} to {} entries...",
            self.path.display(),
            live.len()
        );

        let result = (|| -> Result<u64, LLError> {
            let mut w = BufWriter::new(truncate_options().open(&temp)?);
            w.write_all(&header())?;
            let mut len = JOURNAL_HEADER_LEN;
            for (key, value) in &live {
                w.write_all(&[TAG_PUT])?;
                write_frame(&mut w, key, value)?;
                len += 9 + key.len() as u64 + value.len() as u64;
            }
            let file = w.into_inner().map_err(|e| LLError::from(e.into_error()))?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)?;
            Ok(len)
        })();

        match result {
            Ok(len) => {
                self.file = None;
                self.len = len;
                Ok(live.len())
            }
            Err(e) => {
                remove_stale_temp(&self.path);
                Err(e)
            }
        }
    }

    /// The append handle and the offset the next record starts at.
    fn writer(&mut self) -> Result<(&mut File, u64), LLError> {
        if self.file.is_none() {
            let file = if self.is_created() {
                OpenOptions::new().append(true).open(&self.path)?
            } else {
                log::debug!("Creating journal {}...", self.path.display());
                let mut file = append_new_options().open(&self.path)?;
                file.write_all(&header())?;
                file.sync_all()?;
                self.len = JOURNAL_HEADER_LEN;
                file
            };
            self.file = Some(file);
        }
        let len = self.len;
        let file = self.file.as_mut().ok_or(LLError::Closed)?;
        Ok((file, len))
    }
}

impl LLReader for Journal {
    fn ll_get(&mut self, key: &[u8]) -> Result<Option<Bytes>, LLError> {
        self.get(key)
    }
}

impl LLWriter for Journal {
    fn ll_put(&mut self, key: &[u8], value: Bytes) -> Result<(), LLError> {
        self.append(JournalOp::Put, key, &value)
    }

    fn ll_delete(&mut self, key: &[u8]) -> Result<bool, LLError> {
        if self.get(key)?.is_none() {
            return Ok(false);
        }
        self.append(JournalOp::Delete, key, &[])?;
        Ok(true)
    }
}

fn header() -> [u8; JOURNAL_HEADER_LEN as usize] {
    let mut buf = [0u8; JOURNAL_HEADER_LEN as usize];
    buf[0..4].copy_from_slice(&JOURNAL_MAGIC);
    buf[4..8].copy_from_slice(&JOURNAL_VERSION.to_le_bytes());
    buf
}

fn read_header<R: Read>(r: &mut R) -> Result<(), LLError> {
    let mut buf = [0u8; JOURNAL_HEADER_LEN as usize];
    r.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => LLError::corrupt(0, "too short for a journal header"),
        _ => LLError::from(e),
    })?;
    if buf[0..4] != JOURNAL_MAGIC {
        return Err(LLError::corrupt(0, "bad magic, not a journal"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&buf[4..8]);
    let version = u32::from_le_bytes(version);
    if version != JOURNAL_VERSION {
        return Err(LLError::corrupt(
            4,
            format!("unsupported journal version {}", version),
        ));
    }
    Ok(())
}

/// Read records until end of input, returning the offset just past the last
/// one.
fn scan<R: Read>(
    r: &mut R,
    mut visit: impl FnMut(JournalOp, Bytes, Bytes),
) -> Result<u64, ScanError> {
    let mut offset = JOURNAL_HEADER_LEN;
    loop {
        let mut tag = [0u8; 1];
        match r.read(&mut tag) {
            Ok(0) => return Ok(offset),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ScanError {
                    good_end: offset,
                    error: e.into(),
                })
            }
        }
        let op = match tag[0] {
            TAG_PUT => JournalOp::Put,
            TAG_DELETE => JournalOp::Delete,
            other => {
                return Err(ScanError {
                    good_end: offset,
                    error: LLError::corrupt(offset, format!("unknown record tag {:#04x}", other)),
                })
            }
        };
        let ((key, value), next) = read_frame(r, offset + 1).map_err(|error| ScanError {
            good_end: offset,
            error,
        })?;
        visit(op, key, value);
        offset = next;
    }
}
