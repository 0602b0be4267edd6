//! Error taxonomy for the classification pipeline
//!
//! Every variant is fatal. Missing precision data is not an error: it is
//! resolved by the conservative default and reported in aggregate through
//! [`crate::classify::ClassCounts::missing`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A mandatory fact file does not exist
    #[error("input fact file not found: {}", path.display())]
    Input { path: PathBuf },

    /// A line violates the two-field / integer contract
    #[error("malformed fact in {}:{line}: {reason}", path.display())]
    MalformedFact {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Empty ratio population or non-positive baseline cost
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Caller-supplied parameter out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pre-analysis stage did not leave a usable export behind
    #[error("external stage '{stage}' failed: {reason}")]
    ExternalToolFailure { stage: String, reason: String },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClassifyError {
    pub(crate) fn malformed(path: &std::path::Path, line: usize, reason: impl Into<String>) -> Self {
        ClassifyError::MalformedFact {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ClassifyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
