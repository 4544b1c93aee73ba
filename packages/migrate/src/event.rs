use sasldb_core_store::{LLError, LegacyRecord, ReadError, SkipReason, WriteError};

/// Something that happened during a pass, in the order it happened.
///
/// Events borrow from the driver and are only valid inside the observer call.
#[derive(Debug)]
pub enum MigrationEvent<'a> {
    /// A record is about to be written.
    Converting { record: &'a LegacyRecord },
    /// The destination accepted the record.
    Migrated { record: &'a LegacyRecord },
    /// A malformed entry was skipped.
    Skipped { key: &'a [u8], reason: SkipReason },
    /// A mechanism marker was passed over.
    MarkerSkipped { record: &'a LegacyRecord },
    /// The destination refused the record.
    WriteFailed {
        record: &'a LegacyRecord,
        error: &'a WriteError,
    },
    /// Releasing the cursor or handle failed.
    CloseFailed { error: &'a LLError },
    /// The engine failed mid-walk.
    Aborted { error: &'a ReadError },
    /// The walk stopped on request.
    Cancelled,
}
