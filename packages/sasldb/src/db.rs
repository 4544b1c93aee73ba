use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sasldb_core_store::{decode, encode_key, CredentialWriter, LegacyRecord, WriteError};
use sasldb_hash_store::Journal;
use sasldb_ll_store::{LLReader, LLWriter};

use crate::SaslDbError;

/// A credential store backed by one write-through journal.
///
/// Every successful [`SaslDb::put_data`] is on disk before it returns; no
/// entries are cached in memory.
#[derive(Debug)]
pub struct SaslDb {
    path: PathBuf,
    journal: Journal,
}

impl SaslDb {
    /// Open the store at `path`, or start an empty one if nothing is there yet.
    ///
    /// Nothing is created on disk until the first write or [`SaslDb::sync`].
    pub fn open(path: impl AsRef<Path>) -> Result<SaslDb, SaslDbError> {
        let path = path.as_ref().to_path_buf();
        let journal = Journal::open(&path).map_err(|source| SaslDbError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(SaslDb { path, journal })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live credentials. Reads the whole journal.
    pub fn len(&self) -> Result<usize, SaslDbError> {
        Ok(self.journal.live_entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, SaslDbError> {
        Ok(self.len()? == 0)
    }

    /// Store `secret` under `(authid, realm, prop_name)`, replacing any
    /// previous value. `None` removes the entry.
    pub fn put_data(
        &mut self,
        authid: &[u8],
        realm: &[u8],
        prop_name: &[u8],
        secret: Option<&[u8]>,
    ) -> Result<(), SaslDbError> {
        if authid.is_empty() {
            return Err(SaslDbError::BadParam("empty authid"));
        }
        if prop_name.is_empty() {
            return Err(SaslDbError::BadParam("empty prop name"));
        }
        let key = encode_key(authid, realm, prop_name)?;

        match secret {
            Some(secret) => self.journal.ll_put(&key, Bytes::copy_from_slice(secret))?,
            None => {
                if !self.journal.ll_delete(&key)? {
                    log::debug!("delete of a missing entry in {}", self.path.display());
                }
            }
        }
        Ok(())
    }

    pub fn get_data(
        &mut self,
        authid: &[u8],
        realm: &[u8],
        prop_name: &[u8],
    ) -> Result<Option<Bytes>, SaslDbError> {
        let key = encode_key(authid, realm, prop_name)?;
        Ok(self.journal.ll_get(&key)?)
    }

    /// Every stored credential, ordered by composite key.
    pub fn entries(&self) -> Result<Vec<LegacyRecord>, SaslDbError> {
        let live = self.journal.live_entries()?;
        Ok(live
            .iter()
            .filter_map(|(key, value)| match decode(key, value) {
                Ok(record) => Some(record),
                Err(reason) => {
                    log::warn!("ignoring entry in {}: {}", self.path.display(), reason);
                    None
                }
            })
            .collect())
    }

    /// Check that the store can be written where it lives.
    ///
    /// The parent directory has to exist and be writable, and a file already
    /// at the path has to be a complete journal.
    pub fn check(&self) -> Result<(), SaslDbError> {
        let not_ready = |reason: String| SaslDbError::NotReady {
            path: self.path.clone(),
            reason,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let meta = fs::metadata(parent)
            .map_err(|e| not_ready(format!("directory {}: {}", parent.display(), e)))?;
        if !meta.is_dir() {
            return Err(not_ready(format!("{} is not a directory", parent.display())));
        }
        if meta.permissions().readonly() {
            return Err(not_ready(format!("directory {} is read-only", parent.display())));
        }

        if self.path.exists() {
            Journal::verify(&self.path).map_err(|e| not_ready(e.to_string()))?;
        }
        Ok(())
    }

    /// Create the store file if nothing has been written yet and flush it.
    pub fn sync(&mut self) -> Result<(), SaslDbError> {
        self.journal.sync().map_err(|source| SaslDbError::Sync {
            path: self.path.clone(),
            source,
        })
    }

    /// Drop superseded and deleted records from the file.
    pub fn compact(&mut self) -> Result<usize, SaslDbError> {
        let kept = self.journal.compact().map_err(|source| SaslDbError::Sync {
            path: self.path.clone(),
            source,
        })?;
        log::info!("compacted {} to {} entries", self.path.display(), kept);
        Ok(kept)
    }
}

impl CredentialWriter for SaslDb {
    fn check(&mut self) -> Result<(), WriteError> {
        SaslDb::check(self).map_err(WriteError::from)
    }

    fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
        self.put_data(
            record.authid(),
            record.realm(),
            record.prop_name(),
            Some(record.secret()),
        )
        .map_err(WriteError::from)
    }
}
