use std::io;
use std::path::PathBuf;

use sasldb_core_store::WriteError;
use sasldb_migrate::MigrateError;
use sasldb_store::SaslDbError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Old and new databases must be different files")]
    SamePath,

    #[error("{} already exists, refusing to overwrite it", .0.display())]
    DestinationExists(PathBuf),

    #[error("Cannot use {}: {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: SaslDbError,
    },

    #[error("Destination is not ready: {0}")]
    NotReady(#[source] WriteError),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error("Error writing {}: {source}", .path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: SaslDbError,
    },

    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),
}
