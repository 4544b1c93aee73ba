//! sasldb-convert: copy every credential from a legacy sasldb file into a new
//! store.
//!
//! The binary is a thin wrapper around [`convert`], which takes its input and
//! output streams as parameters.

mod config;
mod convert;
mod error;

pub use config::{Args, Config, ReportFormat, ASSUME_YES_ENV};
pub use convert::convert;
pub use error::CliError;
