use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared "stop at the next record boundary" signal.
///
/// The driver checks the flag before every cursor advance; a record that is
/// already being decoded or written always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying atomic, for registering with a signal handler.
    pub fn as_atomic(&self) -> &Arc<AtomicBool> {
        &self.0
    }
}

impl From<Arc<AtomicBool>> for CancelFlag {
    fn from(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }
}
