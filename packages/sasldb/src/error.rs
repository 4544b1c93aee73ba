use std::path::PathBuf;

use sasldb_core_store::{KeyError, WriteError};
use sasldb_ll_store::LLError;

#[derive(thiserror::Error, Debug)]
pub enum SaslDbError {
    #[error("Couldn't open db {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: LLError,
    },

    #[error("Couldn't update db {}: {source}", .path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: LLError,
    },

    #[error("{} is not usable: {reason}", .path.display())]
    NotReady { path: PathBuf, reason: String },

    #[error("Bad parameter: {0}")]
    BadParam(&'static str),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Store(#[from] LLError),
}

impl From<SaslDbError> for WriteError {
    fn from(e: SaslDbError) -> Self {
        match e {
            SaslDbError::BadParam(message) => WriteError::BadParam {
                message: message.to_string(),
            },
            SaslDbError::NotReady { .. } => WriteError::NotReady {
                message: e.to_string(),
            },
            SaslDbError::Key(e) => WriteError::Key(e),
            SaslDbError::Store(e) => WriteError::Store(e),
            other => WriteError::Other(Box::new(other)),
        }
    }
}
