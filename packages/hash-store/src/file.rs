use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sasldb_ll_store::{LLCursor, LLError, LLOpener, LLTable};

use crate::cursor::HashFileCursor;
use crate::format::{Header, HEADER_LEN};

/// How [`HashFile::open_with`] treats the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Open read/write, creating an empty table if the file is missing.
    ///
    /// A file that exists but cannot be opened for writing is opened
    /// read-only instead.
    #[default]
    CreateIfMissing,
    /// Open an existing file read-only.
    ReadOnly,
}

/// An open hash file.
///
/// Cursors created from a `HashFile` read through their own file handle and
/// never buffer more than one frame.
#[derive(Debug)]
pub struct HashFile {
    path: PathBuf,
    file: Option<File>,
    header: Header,
}

impl HashFile {
    /// Open `path`, creating an empty table if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<HashFile, LLError> {
        Self::open_with(path, OpenMode::CreateIfMissing)
    }

    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode) -> Result<HashFile, LLError> {
        let path = path.as_ref();
        let mut file = match mode {
            OpenMode::ReadOnly => File::open(path)?,
            OpenMode::CreateIfMissing => match create_options().open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied && path.exists() => {
                    log::debug!(
                        "{} is not writable, opening read-only: {}",
                        path.display(),
                        e
                    );
                    File::open(path)?
                }
                Err(e) => return Err(e.into()),
            },
        };

        let len = file.metadata()?.len();
        let header = if len == 0 && mode == OpenMode::CreateIfMissing {
            log::debug!("Initializing empty hash file {}...", path.display());
            let header = Header::empty();
            file.write_all(&header.encode())?;
            file.sync_all()?;
            header
        } else if len < HEADER_LEN {
            return Err(LLError::corrupt(
                0,
                format!("{} bytes is too short for a header", len),
            ));
        } else {
            let mut buf = [0u8; HEADER_LEN as usize];
            file.read_exact(&mut buf)?;
            Header::decode(&buf)?
        };

        log::debug!(
            "Opened {} ({} entries, {} buckets)",
            path.display(),
            header.entry_count,
            header.bucket_count
        );

        Ok(HashFile {
            path: path.to_path_buf(),
            file: Some(file),
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Create a streaming cursor with a concrete type.
    ///
    /// The cursor reopens the file so its read position is independent of
    /// the handle and of other cursors.
    pub fn file_cursor(&mut self) -> Result<HashFileCursor, LLError> {
        if self.file.is_none() {
            return Err(LLError::Closed);
        }
        let file = File::open(&self.path)?;
        Ok(HashFileCursor::new(file, self.header.entry_count))
    }
}

#[cfg(unix)]
fn create_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).mode(0o664);
    options
}

#[cfg(not(unix))]
fn create_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    options
}

/// Options for a journal that must not exist yet; every write appends.
#[cfg(unix)]
pub(crate) fn append_new_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.append(true).create_new(true).mode(0o664);
    options
}

#[cfg(not(unix))]
pub(crate) fn append_new_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.append(true).create_new(true);
    options
}

/// Options for files written by [`crate::HashTable::persist`].
pub(crate) fn truncate_options() -> OpenOptions {
    let mut options = create_options();
    options.truncate(true);
    options
}

pub(crate) fn sibling_temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl LLTable for HashFile {
    fn cursor(&mut self) -> Result<Box<dyn LLCursor>, LLError> {
        Ok(Box::new(self.file_cursor()?))
    }

    fn close(&mut self) -> Result<(), LLError> {
        let file = self.file.take().ok_or(LLError::Closed)?;
        log::debug!("Closing {}", self.path.display());
        drop(file);
        Ok(())
    }
}

/// Opens [`HashFile`]s with open-or-create semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashFileOpener {
    pub mode: OpenMode,
}

impl HashFileOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        HashFileOpener {
            mode: OpenMode::ReadOnly,
        }
    }
}

impl LLOpener for HashFileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn LLTable>, LLError> {
        Ok(Box::new(HashFile::open_with(path, self.mode)?))
    }
}

/// Remove a leftover temp file from an interrupted persist, if any.
pub(crate) fn remove_stale_temp(path: &Path) {
    let temp = sibling_temp_path(path);
    if temp.exists() {
        if let Err(e) = fs::remove_file(&temp) {
            log::warn!("Could not remove stale {}: {}", temp.display(), e);
        }
    }
}
