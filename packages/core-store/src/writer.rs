//! The destination seam.

use crate::{LegacyRecord, WriteError};

/// A store that accepts decoded credentials, one at a time.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn CredentialWriter>`.
pub trait CredentialWriter {
    /// Verify the destination is usable before anything is written.
    ///
    /// The default implementation accepts unconditionally.
    fn check(&mut self) -> Result<(), WriteError> {
        Ok(())
    }

    /// Insert or replace the credential `(authid, realm, prop_name)`.
    fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError>;
}

// Blanket implementations for references and boxes

impl<T: CredentialWriter + ?Sized> CredentialWriter for &mut T {
    fn check(&mut self) -> Result<(), WriteError> {
        (*self).check()
    }

    fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
        (*self).write_record(record)
    }
}

impl<T: CredentialWriter + ?Sized> CredentialWriter for Box<T> {
    fn check(&mut self) -> Result<(), WriteError> {
        self.as_mut().check()
    }

    fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
        self.as_mut().write_record(record)
    }
}
