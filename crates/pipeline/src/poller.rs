//! Status polling until a job reaches a terminal state.

use echopress_engine::{FailureCategory, JobState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::PollConfig;
use crate::engine_api::ConversionEngine;
use crate::error::PipelineError;
use crate::types::{ConvertEvent, Phase};

/// Drives a submitted job to a terminal state.
///
/// The loop is awaited, never detached: cancellation is observed inside
/// every sleep, and exceeding the attempt ceiling yields the distinct
/// timeout state, since the job may still be running remotely.
pub struct JobPoller<'a> {
    engine: &'a dyn ConversionEngine,
    config: PollConfig,
    cancel: CancellationToken,
}

impl<'a> JobPoller<'a> {
    pub fn new(engine: &'a dyn ConversionEngine, config: PollConfig, cancel: CancellationToken) -> Self {
        Self {
            engine,
            config,
            cancel,
        }
    }

    /// Polls until the job succeeds, fails, times out or is cancelled.
    ///
    /// Returns the result locator on success. Polls immediately after
    /// submission, then sleeps `interval` between attempts.
    pub async fn poll_until_terminal(
        &self,
        job_id: &str,
        events_tx: &mpsc::Sender<ConvertEvent>,
    ) -> Result<String, PipelineError> {
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            attempts += 1;

            let snapshot = self.engine.status(job_id).await?;
            match snapshot.state {
                JobState::Running { progress } => {
                    debug!(job = %job_id, attempts, progress, "job still running");
                    let _ = events_tx
                        .send(ConvertEvent::Progress {
                            phase: Phase::Converting,
                            percent: progress,
                        })
                        .await;
                }
                JobState::Succeeded { result_url } => {
                    info!(job = %job_id, attempts, "job finished");
                    let _ = events_tx
                        .send(ConvertEvent::Progress {
                            phase: Phase::Converting,
                            percent: 100,
                        })
                        .await;
                    return Ok(result_url);
                }
                JobState::Failed { code, message } => {
                    let category = FailureCategory::from_code(&code);
                    error!(job = %job_id, code = %code, message = %message, "job failed");
                    return Err(PipelineError::Conversion {
                        category,
                        code,
                        message,
                    });
                }
            }

            if attempts >= self.config.max_attempts {
                return Err(PipelineError::Timeout { attempts });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}
