//! Error types for the record layer.

use std::path::PathBuf;

use sasldb_ll_store::LLError;

/// Errors from [`crate::LegacyReader`].
///
/// All of these are fatal to a migration pass. Per-record problems are not
/// errors; they are [`crate::SkipReason`]s.
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("Error opening password file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: LLError,
    },

    #[error("Making cursor failure: {0}")]
    Cursor(#[source] LLError),

    #[error("A cursor is already open on {}", .0.display())]
    CursorAlreadyOpen(PathBuf),

    #[error("No cursor is open")]
    NoCursor,

    #[error("Iteration failure: {0}")]
    Iteration(#[source] LLError),
}

/// Errors building a composite key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("{field} contains a NUL byte")]
    EmbeddedNul { field: &'static str },

    #[error("prop name of {len} bytes does not fit the legacy buffer")]
    PropNameTooLong { len: usize },
}

/// Errors from a [`crate::CredentialWriter`].
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("Bad parameter: {message}")]
    BadParam { message: String },

    #[error("Invalid key: {0}")]
    Key(#[from] KeyError),

    #[error("Destination is not ready: {message}")]
    NotReady { message: String },

    #[error("Store error: {0}")]
    Store(#[from] LLError),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn open_error_names_the_path() {
        let e = ReadError::Open {
            path: PathBuf::from("/etc/sasldb2"),
            source: LLError::NotSupported,
        };
        let display = e.to_string();
        assert!(display.contains("/etc/sasldb2"));
        assert!(display.contains("operation not supported"));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn iteration_error_keeps_source() {
        let e = ReadError::Iteration(LLError::corrupt(16, "truncated key"));
        assert!(e.to_string().contains("truncated key"));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn write_error_conversions() {
        let e: WriteError = KeyError::EmbeddedNul { field: "realm" }.into();
        assert!(matches!(e, WriteError::Key(_)));
        assert!(e.to_string().contains("realm"));

        let e: WriteError = LLError::Closed.into();
        assert!(matches!(e, WriteError::Store(_)));
    }
}
