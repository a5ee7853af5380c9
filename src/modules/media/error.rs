use crate::infrastructure::process::ProcessError;
use crate::infrastructure::storage::StorageError;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Source object '{0}' is empty")]
    SourceEmpty(String),

    #[error("Failed to download source: {0}")]
    Download(#[source] StorageError),

    #[error("Transcode failed with exit code {}: {stderr_tail}", fmt_exit_code(.exit_code))]
    TranscodeFailed {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Transcode timed out after {0} seconds")]
    TranscodeTimeout(u64),

    #[error("Duration probe failed: {0}")]
    ProbeFailed(String),

    #[error("Duration probe timed out after {0} seconds")]
    ProbeTimeout(u64),

    #[error(
        "Frame extraction at {timestamp:.3}s failed with exit code {}: {stderr_tail}",
        fmt_exit_code(.exit_code)
    )]
    FrameExtractionFailed {
        timestamp: f64,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Manifest does not match uploaded segments: {0}")]
    ManifestMismatch(String),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("Applying ACL failed: {0}")]
    Acl(#[source] StorageError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
}

impl MediaError {
    /// Errors caused by the input rather than by this service or its dependencies.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MediaError::SourceEmpty(_) | MediaError::Download(StorageError::NotFound(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_failure_message_carries_code_and_tail() {
        let err = MediaError::TranscodeFailed {
            exit_code: Some(1),
            stderr_tail: "codec not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains('1'));
        assert!(message.contains("codec not found"));
    }

    #[test]
    fn test_signal_exit_is_described() {
        let err = MediaError::TranscodeFailed {
            exit_code: None,
            stderr_tail: String::new(),
        };
        assert!(err.to_string().contains("killed by signal"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(MediaError::SourceEmpty("uploads/a.mp4".into()).is_client_error());
        assert!(MediaError::Download(StorageError::NotFound("a".into())).is_client_error());
        assert!(!MediaError::TranscodeTimeout(60).is_client_error());
    }
}
