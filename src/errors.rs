use rusoto_core::RusotoError;
use rusoto_s3::{DeleteObjectError, HeadObjectError, PutObjectError};
use thiserror::Error;
use uuid::Uuid;

use crate::song::SongId;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Song {0} does not exist")]
    NonExistentSong(SongId),

    #[error("Recording {0} does not exist")]
    NonExistentRecording(Uuid),

    #[error("Artist name already exists")]
    ArtistAlreadyExists,

    /// Represents an error caused by missing parts in a form submission.
    #[error("Missing parts")]
    PartsMissing,

    #[error("Malformed form submission")]
    MalformedFormSubmission,

    #[error("Malformed upload metadata: {source}")]
    MalformedUploadMetadata { source: serde_json::Error },

    /// Represents an SQL error.
    #[error("SQLx error: {source}")]
    Sqlx { source: sqlx::Error },

    #[error("Failed to delete object from store: {source}")]
    DeleteFailed { source: RusotoError<DeleteObjectError> },

    #[error("Failed to check object in store: {source}")]
    HeadFailed { source: RusotoError<HeadObjectError> },

    #[error("Failed to upload object to store: {source}")]
    UploadFailed { source: RusotoError<PutObjectError> },

    #[error("Store call timed out")]
    StoreTimeout,

    #[error("Failed to generate signed URL: {url}: {source}")]
    UnableToParseSignedUrl { url: String, source: url::ParseError },
}

impl BackendError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        BackendError::BadRequest {
            message: message.into(),
        }
    }

    /// Whether retrying the store call may succeed.
    pub fn is_transient(&self) -> bool {
        use BackendError::*;

        match self {
            StoreTimeout => true,
            DeleteFailed { source: RusotoError::HttpDispatch(_) } => true,
            HeadFailed { source: RusotoError::HttpDispatch(_) } => true,
            UploadFailed { source: RusotoError::HttpDispatch(_) } => true,
            _ => false,
        }
    }
}
