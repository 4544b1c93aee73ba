use sasldb_core_store::ReadError;

use crate::MigrationReport;

/// Ways a migration pass can end early.
///
/// Open and cursor failures happen before any record is touched. Iteration
/// failures and cancellation carry the report of what was done up to that
/// point.
#[derive(thiserror::Error, Debug)]
pub enum MigrateError {
    #[error("{0}")]
    Open(#[source] ReadError),

    #[error("{0}")]
    Cursor(#[source] ReadError),

    #[error("migration aborted after {} entries: {source}", .report.seen)]
    Iteration {
        #[source]
        source: ReadError,
        report: MigrationReport,
    },

    #[error("migration cancelled after {} entries", .report.seen)]
    Cancelled { report: MigrationReport },
}

impl MigrateError {
    /// The report of work done before the pass ended, if any was done.
    pub fn partial_report(&self) -> Option<&MigrationReport> {
        match self {
            MigrateError::Open(_) | MigrateError::Cursor(_) => None,
            MigrateError::Iteration { report, .. } | MigrateError::Cancelled { report } => {
                Some(report)
            }
        }
    }
}
