//! Pipeline configuration.
//!
//! All ceilings, sizes and cadences are tunable; nothing in the pipeline
//! assumes the defaults.

use std::time::Duration;

use echopress_engine::OutputParams;
use echopress_transfer::DEFAULT_CHUNK_SIZE;

use crate::retry::RetryPolicy;

/// Tuning for the job status-poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait between status checks.
    pub interval: Duration,
    /// Hard ceiling on status checks before the job is declared timed out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

/// Configuration for one conversion pipeline instance.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Chunk size in bytes; 0 falls back to the default (5 MiB).
    pub chunk_size: usize,
    /// Retry budget for each chunk write.
    pub upload_retry: RetryPolicy,
    /// Retry budget for the artifact persist+verify step.
    pub persist_retry: RetryPolicy,
    pub poll: PollConfig,
    pub output: OutputParams,
    /// Optional key namespace (e.g. a user id) prefixed to session keys so
    /// concurrent users never collide in temporary storage.
    pub namespace: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            upload_retry: RetryPolicy::default(),
            persist_retry: RetryPolicy::default(),
            poll: PollConfig::default(),
            output: OutputParams::default(),
            namespace: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let config = ConvertConfig::default();
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.upload_retry.max_attempts, 3);
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, 60);
        assert!(config.namespace.is_none());
    }
}
