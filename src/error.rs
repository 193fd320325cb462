use std::path::PathBuf;

use thiserror::Error;

use crate::base::DocId;

/// Errors raised while building or reading an index
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt term record: {reason}")]
    Decode { reason: String },

    #[error("Unknown weight function {0}")]
    UnknownWeightFunction(u8),

    #[error("Document {doc_id} ({locator}) could not be read: {source}")]
    MissingDocument {
        doc_id: DocId,
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Index at {0} is incomplete (no manifest found)")]
    IncompleteIndex(PathBuf),

    #[error("Block worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("The background sort of the results did not complete")]
    BackgroundSortFailed,
}

impl Error {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            reason: reason.into(),
        }
    }
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for Error {
    fn from(error: ciborium::de::Error<T>) -> Self {
        Error::Serialization(error.to_string())
    }
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for Error {
    fn from(error: ciborium::ser::Error<T>) -> Self {
        Error::Serialization(error.to_string())
    }
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, Error>;
