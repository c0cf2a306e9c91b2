use crate::services::provisioner::ProvisionError;
use crate::utils::validation::ValidationError;
use axum::http::StatusCode;
use std::io;
use thiserror::Error;

pub const NO_FILE_PART: &str = "It seems that the uploaded file is empty";
pub const NO_FILENAME: &str = "No file was uploaded";

#[derive(Error, Debug)]
pub enum IngestError {
    /// No file part, or a file part without a filename
    #[error("{0}")]
    Missing(&'static str),

    #[error("Invalid filename: {0}")]
    InvalidFilename(#[from] ValidationError),

    /// The client stream failed before it was exhausted
    #[error("Upload stream interrupted: {0}")]
    Interrupted(#[source] io::Error),

    #[error("Directory provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Staging file I/O failed: {0}")]
    Staging(#[source] io::Error),

    #[error("Uploaded and saved files have different sizes: uploaded {expected}, saved {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("File could not be saved: {0}")]
    CommitFailed(#[source] io::Error),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Missing(_)
            | IngestError::InvalidFilename(_)
            | IngestError::Interrupted(_) => StatusCode::BAD_REQUEST,
            IngestError::Provision(_)
            | IngestError::Staging(_)
            | IngestError::SizeMismatch { .. }
            | IngestError::CommitFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client; never contains server paths.
    pub fn public_message(&self) -> String {
        match self {
            IngestError::Missing(msg) => msg.to_string(),
            IngestError::InvalidFilename(e) => e.message.clone(),
            IngestError::Interrupted(_) => "Upload stream ended unexpectedly".to_string(),
            IngestError::Provision(_) | IngestError::Staging(_) => {
                "Internal Server Error".to_string()
            }
            IngestError::SizeMismatch { .. } => self.to_string(),
            IngestError::CommitFailed(_) => "Unable to save file".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            IngestError::Missing(NO_FILE_PART).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::SizeMismatch {
                expected: 100,
                actual: 50
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IngestError::CommitFailed(io::Error::other("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_messages_hide_paths() {
        let err = IngestError::Provision(ProvisionError::NotADirectory(PathBuf::from(
            "/srv/secret/data",
        )));
        assert!(err.to_string().contains("/srv/secret/data"));
        assert_eq!(err.public_message(), "Internal Server Error");
    }
}
