//! Error types for the LL layer.
//!
//! Errors at this level are engine-focused. No semantic errors like
//! "malformed composite key" - those belong in higher layers.

/// Errors at the LL (low-level) layer.
///
/// These are I/O and engine-level errors only. A record whose key does not
/// follow the composite-key layout is not an `LLError`; it is reported by the
/// record decoder one layer up.
#[derive(Debug)]
pub enum LLError {
    /// Generic I/O failure.
    ///
    /// Use this for file I/O errors, permission errors, etc.
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// The operation is not supported by this engine.
    ///
    /// For example, writing through a read-only handle.
    NotSupported,

    /// The engine's own framing is damaged.
    ///
    /// Bad magic, truncated frames, impossible lengths. This is distinct from
    /// a well-framed entry whose key content is malformed.
    Corrupt {
        /// Byte offset at which the damage was detected.
        offset: u64,
        /// Human readable description.
        message: String,
    },

    /// The handle or cursor was already closed.
    Closed,
}

impl LLError {
    /// Shorthand for a [`LLError::Corrupt`] error.
    pub fn corrupt(offset: u64, message: impl Into<String>) -> Self {
        LLError::Corrupt {
            offset,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLError::Transport(e) => write!(f, "transport error: {}", e),
            LLError::NotSupported => write!(f, "operation not supported"),
            LLError::Corrupt { offset, message } => {
                write!(f, "corrupt table at offset {}: {}", offset, message)
            }
            LLError::Closed => write!(f, "handle already closed"),
        }
    }
}

impl std::error::Error for LLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LLError::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LLError {
    fn from(e: std::io::Error) -> Self {
        LLError::Transport(Box::new(e))
    }
}
