//! Pipeline error taxonomy.

use echopress_engine::{EngineError, FailureCategory};

use crate::store::StoreError;

/// Errors produced while driving a conversion session.
///
/// Every variant is terminal for its session; transient failures are
/// retried inside the stages and only surface here once a retry budget is
/// exhausted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("chunk {index} upload failed after {attempts} attempts: {source}")]
    ChunkUpload {
        index: usize,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conversion engine rejected the job: {0}")]
    EngineRejected(String),

    /// Rate-limit or quota rejection; callers should suggest trying again
    /// later rather than an immediate retry.
    #[error("conversion engine quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("conversion failed ({category}): {message}")]
    Conversion {
        category: FailureCategory,
        code: String,
        message: String,
    },

    /// The polling ceiling was exceeded while the job was still running
    /// remotely. Distinct from [`PipelineError::Conversion`].
    #[error("conversion timed out after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("artifact verification failed: {0}")]
    Verification(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Quota { status, body } => {
                PipelineError::QuotaExceeded(format!("{status}: {body}"))
            }
            other => PipelineError::EngineRejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_engine_error_maps_to_quota_variant() {
        let err: PipelineError = EngineError::Quota {
            status: 429,
            body: "slow down".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::QuotaExceeded(_)));
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn other_engine_errors_map_to_rejection() {
        let err: PipelineError = EngineError::Rejected {
            status: 422,
            body: "bad params".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::EngineRejected(_)));
    }

    #[test]
    fn conversion_error_message_names_category() {
        let err = PipelineError::Conversion {
            category: FailureCategory::SourceDownload,
            code: "DOWNLOAD_FAILED".into(),
            message: "404 from origin".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("source download failed"));
        assert!(msg.contains("404 from origin"));
    }
}
