//! Mapping store errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Read or delete of a document that does not exist. Reads of a file
    /// that is not valid JSON land here too.
    #[error("Model name {name} not found")]
    NotFound { name: String },

    #[error("invalid mapping name {name:?}")]
    InvalidName { name: String },

    #[error("no {marker} directory found above {}", start.display())]
    RootNotFound { start: PathBuf, marker: String },

    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
