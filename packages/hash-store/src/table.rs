use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::Bytes;
use sasldb_ll_store::{CursorMove, LLCursor, LLError, LLReader, LLTable, LLWriter};

use crate::file::{remove_stale_temp, sibling_temp_path, truncate_options, HashFile, OpenMode};
use crate::format::{bucket_count_for, bucket_of, write_frame, Header};

/// An in-memory hash table that persists to the hash-file layout.
///
/// Writes only touch memory; [`HashTable::persist`] writes a complete new file
/// next to the target and renames it into place, so a reader never observes a
/// half-written table.
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    entries: HashMap<Bytes, Bytes>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every entry of an existing hash file.
    pub fn load(path: impl AsRef<Path>) -> Result<HashTable, LLError> {
        let mut file = HashFile::open_with(path, OpenMode::ReadOnly)?;
        let mut cursor = file.file_cursor()?;
        let mut table = HashTable::new();

        let mut step = CursorMove::First;
        while let Some((key, value)) = cursor.advance(step)? {
            table.entries.insert(key, value);
            step = CursorMove::Next;
        }

        cursor.close()?;
        file.close()?;
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.entries.get(key)
    }

    /// Iterate over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.entries.iter()
    }

    /// Entries in on-disk order: by bucket, then by key.
    fn bucket_ordered(&self, bucket_count: u32) -> Vec<(&Bytes, &Bytes)> {
        let mut ordered: Vec<_> = self.entries.iter().collect();
        ordered.sort_by(|(a, _), (b, _)| {
            bucket_of(a, bucket_count)
                .cmp(&bucket_of(b, bucket_count))
                .then_with(|| a.cmp(b))
        });
        ordered
    }

    /// Write the table to `path`, replacing any existing file atomically.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), LLError> {
        let path = path.as_ref();
        let entry_count = u32::try_from(self.entries.len())
            .map_err(|_| LLError::corrupt(0, "too many entries for one hash file"))?;
        let header = Header {
            bucket_count: bucket_count_for(self.entries.len()),
            entry_count,
        };

        let temp = sibling_temp_path(path);
        log::debug!(
            "Writing {} entries to {}...",
            entry_count,
            temp.display()
        );

        let result = (|| -> Result<(), LLError> {
            let mut w = BufWriter::new(truncate_options().open(&temp)?);
            w.write_all(&header.encode())?;
            for (key, value) in self.bucket_ordered(header.bucket_count) {
                write_frame(&mut w, key, value)?;
            }
            let file = w.into_inner().map_err(|e| LLError::from(e.into_error()))?;
            file.sync_all()?;
            fs::rename(&temp, path)?;
            Ok(())
        })();

        if result.is_err() {
            remove_stale_temp(path);
        }
        result
    }
}

impl LLReader for HashTable {
    fn ll_get(&mut self, key: &[u8]) -> Result<Option<Bytes>, LLError> {
        Ok(self.entries.get(key).cloned())
    }
}

impl LLWriter for HashTable {
    fn ll_put(&mut self, key: &[u8], value: Bytes) -> Result<(), LLError> {
        self.entries.insert(Bytes::copy_from_slice(key), value);
        Ok(())
    }

    fn ll_delete(&mut self, key: &[u8]) -> Result<bool, LLError> {
        Ok(self.entries.remove(key).is_some())
    }
}

impl<K: AsRef<[u8]>, V: AsRef<[u8]>> FromIterator<(K, V)> for HashTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        HashTable {
            entries: iter
                .into_iter()
                .map(|(k, v)| {
                    (
                        Bytes::copy_from_slice(k.as_ref()),
                        Bytes::copy_from_slice(v.as_ref()),
                    )
                })
                .collect(),
        }
    }
}
