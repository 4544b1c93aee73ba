//! Migration driver.
//!
//! Walks a legacy table with a single cursor, decodes each entry, and hands
//! every real credential to a [`CredentialWriter`]. Nothing is buffered: one
//! entry is in flight at a time.
//!
//! Per-record problems (corrupt keys, rejected writes) are counted in the
//! [`MigrationReport`] and the walk continues. Engine failures end the walk
//! with a [`MigrateError`] that still carries the partial report; records
//! already written stay written.
//!
//! # Example
//!
//! ```rust
//! use sasldb_core_store::{CredentialWriter, LegacyRecord, WriteError};
//! use sasldb_ll_store::{MemoryOpener, MemoryTable};
//! use sasldb_migrate::Migrator;
//!
//! struct Print;
//!
//! impl CredentialWriter for Print {
//!     fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
//!         println!("{}", record);
//!         Ok(())
//!     }
//! }
//!
//! let opener = MemoryOpener::new().with_table(
//!     "/etc/sasldb2",
//!     MemoryTable::from_entries([(b"alice\0example.com\0userPassword".as_slice(), b"pw".as_slice())]),
//! );
//!
//! let report = Migrator::new(&opener).migrate("/etc/sasldb2", &mut Print).unwrap();
//! assert_eq!(report.migrated, 1);
//! ```

mod cancel;
mod driver;
mod error;
mod event;
mod report;
mod state;

pub use cancel::CancelFlag;
pub use driver::{migrate, Migrator};
pub use error::MigrateError;
pub use event::MigrationEvent;
pub use report::MigrationReport;
pub use state::MigrationState;

pub use sasldb_core_store::{CredentialWriter, LegacyRecord, SkipReason, WriteError};
