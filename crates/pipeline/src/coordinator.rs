//! Sequential chunk transmission and completion detection.

use echopress_transfer::{Chunk, UploadSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PipelineError;
use crate::job::JobOrchestrator;
use crate::retry::{RetryError, RetryPolicy};
use crate::store::TempStore;
use crate::types::{ConvertEvent, Phase};

/// Drives one session's chunks to temporary storage in index order and
/// hands the completed upload to the job orchestrator.
///
/// Chunks are sent strictly sequentially; this bounds memory and keeps one
/// network operation in flight, and makes upload progress a simple count.
pub struct SessionCoordinator<'a> {
    temp: &'a dyn TempStore,
    retry: &'a RetryPolicy,
    cancel: CancellationToken,
}

impl<'a> SessionCoordinator<'a> {
    pub fn new(temp: &'a dyn TempStore, retry: &'a RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            temp,
            retry,
            cancel,
        }
    }

    /// Uploads every chunk, then submits the conversion job exactly once.
    ///
    /// Each chunk write runs under the retry policy; exhausting the budget
    /// for any chunk aborts the session. Job submission is keyed off the
    /// session's completion edge, which fires at most once, strictly after
    /// the last acknowledged write.
    pub async fn run(
        &self,
        session: &UploadSession,
        chunks: Vec<Chunk>,
        submitter: &JobOrchestrator<'_>,
        events_tx: &mpsc::Sender<ConvertEvent>,
    ) -> Result<String, PipelineError> {
        let mut job_id = None;

        for chunk in chunks {
            self.check_cancelled()?;

            let index = chunk.index;
            let key = session.chunk_key(index);
            self.upload_chunk(&key, &chunk).await?;

            let complete = session.mark_acknowledged(index);
            let percent = session.progress_percent();
            debug!(
                session = %session.key(),
                chunk = index,
                checksum = %chunk.checksum,
                percent,
                "chunk acknowledged"
            );
            let _ = events_tx
                .send(ConvertEvent::Progress {
                    phase: Phase::Uploading,
                    percent,
                })
                .await;

            if complete {
                debug!(session = %session.key(), "all chunks acknowledged");
                job_id = Some(submitter.submit(session).await?);
            }
        }

        // An empty chunk list never reaches the completion edge; the
        // orchestrator's validation rejects empty sources before this point.
        job_id.ok_or_else(|| PipelineError::Validation("no chunks to upload".into()))
    }

    async fn upload_chunk(&self, key: &str, chunk: &Chunk) -> Result<(), PipelineError> {
        let outcome = self
            .retry
            .run(&self.cancel, || {
                let data = chunk.data.as_slice();
                async move { self.temp.put(key, data).await }
            })
            .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(RetryError::Cancelled) => Err(PipelineError::Cancelled),
            Err(RetryError::Exhausted { attempts, error }) => Err(PipelineError::ChunkUpload {
                index: chunk.index,
                attempts,
                source: error,
            }),
        }
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use echopress_engine::{EngineError, FetchedArtifact, JobSnapshot, JobSpec, OutputParams};
    use echopress_transfer::split_bytes;

    use super::*;
    use crate::engine_api::ConversionEngine;
    use crate::store::{MemoryStore, StoreError};

    /// Temp store that fails the first `fail_count` writes per key.
    struct FlakyTempStore {
        inner: MemoryStore,
        failures: Mutex<HashMap<String, u32>>,
        attempts: Mutex<HashMap<String, u32>>,
    }

    impl FlakyTempStore {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: Mutex::new(
                    failures
                        .iter()
                        .map(|(k, n)| (k.to_string(), *n))
                        .collect(),
                ),
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, key: &str) -> u32 {
            self.attempts.lock().unwrap().get(key).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl TempStore for FlakyTempStore {
        async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
            *self
                .attempts
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_insert(0) += 1;

            let should_fail = {
                let mut failures = self.failures.lock().unwrap();
                if let Some(remaining) = failures.get_mut(key)
                    && *remaining > 0
                {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            };
            if should_fail {
                return Err(StoreError::Write("transient outage".into()));
            }

            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            TempStore::get(&self.inner, key).await
        }

        async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
            self.inner.delete(keys).await
        }
    }

    /// Engine mock that records submissions.
    struct RecordingEngine {
        submitted: Mutex<Vec<JobSpec>>,
    }

    impl RecordingEngine {
        fn new() -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn submit_count(&self) -> usize {
            self.submitted.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ConversionEngine for RecordingEngine {
        async fn submit(&self, spec: &JobSpec) -> Result<String, EngineError> {
            self.submitted.lock().unwrap().push(spec.clone());
            Ok("job-1".into())
        }

        async fn status(&self, _job_id: &str) -> Result<JobSnapshot, EngineError> {
            unreachable!("coordinator never polls")
        }

        async fn fetch_result(&self, _url: &str) -> Result<FetchedArtifact, EngineError> {
            unreachable!("coordinator never downloads")
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(100),
        }
    }

    fn sample_session(total: usize) -> UploadSession {
        UploadSession::new("clip.webm", "video/webm", total, None)
    }

    async fn drain_percents(rx: &mut mpsc::Receiver<ConvertEvent>) -> Vec<u8> {
        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConvertEvent::Progress { percent, .. } = event {
                percents.push(percent);
            }
        }
        percents
    }

    #[tokio::test]
    async fn uploads_all_chunks_and_submits_once() {
        let store = FlakyTempStore::new(&[]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();
        let session = sample_session(3);
        let chunks = split_bytes(&[7u8; 12], 5);

        let coordinator = SessionCoordinator::new(&store, &retry, CancellationToken::new());
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, mut rx) = mpsc::channel(64);

        let job_id = coordinator
            .run(&session, chunks, &submitter, &tx)
            .await
            .unwrap();

        assert_eq!(job_id, "job-1");
        assert_eq!(engine.submit_count(), 1);
        assert!(session.is_complete());
        for key in session.chunk_keys() {
            assert!(store.inner.contains(&key), "missing {key}");
        }

        // Progress is monotonic and ends at 100.
        let percents = drain_percents(&mut rx).await;
        assert_eq!(percents.len(), 3);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn submission_spec_describes_the_session() {
        let store = FlakyTempStore::new(&[]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();
        let session = sample_session(2);

        let coordinator = SessionCoordinator::new(&store, &retry, CancellationToken::new());
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, _rx) = mpsc::channel(64);

        coordinator
            .run(&session, split_bytes(&[1u8; 8], 5), &submitter, &tx)
            .await
            .unwrap();

        let specs = engine.submitted.lock().unwrap();
        assert_eq!(specs[0].source_url, session.key());
        assert_eq!(specs[0].chunk_count, 2);
        assert_eq!(specs[0].file_name, "clip.webm");
        assert_eq!(specs[0].media_type, "video/webm");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_chunk_failures_are_retried() {
        let session = sample_session(3);
        let flaky_key = session.chunk_key(1);
        let store = FlakyTempStore::new(&[(flaky_key.as_str(), 2)]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();

        let coordinator = SessionCoordinator::new(&store, &retry, CancellationToken::new());
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, _rx) = mpsc::channel(64);

        coordinator
            .run(&session, split_bytes(&[2u8; 12], 5), &submitter, &tx)
            .await
            .unwrap();

        // Two failures then success: 3 attempts for the flaky chunk, one
        // for each of the others.
        assert_eq!(store.attempts_for(&flaky_key), 3);
        assert_eq!(store.attempts_for(&session.chunk_key(0)), 1);
        assert_eq!(store.attempts_for(&session.chunk_key(2)), 1);
        assert_eq!(engine.submit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_chunk_budget_aborts_without_submission() {
        let session = sample_session(3);
        let dead_key = session.chunk_key(1);
        let store = FlakyTempStore::new(&[(dead_key.as_str(), 99)]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();

        let coordinator = SessionCoordinator::new(&store, &retry, CancellationToken::new());
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, _rx) = mpsc::channel(64);

        let err = coordinator
            .run(&session, split_bytes(&[3u8; 12], 5), &submitter, &tx)
            .await
            .unwrap_err();

        match err {
            PipelineError::ChunkUpload {
                index, attempts, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected chunk upload failure, got {other:?}"),
        }
        assert_eq!(engine.submit_count(), 0);
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn single_chunk_file_submits_after_first_write() {
        let store = FlakyTempStore::new(&[]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();
        let session = sample_session(1);

        let coordinator = SessionCoordinator::new(&store, &retry, CancellationToken::new());
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, mut rx) = mpsc::channel(64);

        coordinator
            .run(&session, split_bytes(b"tiny", 5 * 1024 * 1024), &submitter, &tx)
            .await
            .unwrap();

        assert_eq!(engine.submit_count(), 1);
        assert_eq!(drain_percents(&mut rx).await, vec![100]);
    }

    #[tokio::test]
    async fn cancelled_before_start_uploads_nothing() {
        let store = FlakyTempStore::new(&[]);
        let engine = RecordingEngine::new();
        let retry = fast_retry();
        let session = sample_session(2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let coordinator = SessionCoordinator::new(&store, &retry, cancel);
        let submitter = JobOrchestrator::new(&engine, OutputParams::default());
        let (tx, _rx) = mpsc::channel(64);

        let err = coordinator
            .run(&session, split_bytes(&[4u8; 8], 5), &submitter, &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(store.inner.is_empty());
        assert_eq!(engine.submit_count(), 0);
    }
}
