//! Conversion orchestrator: validates input, then runs the stages
//! sequentially with a single cancellation token threaded through.

use echopress_transfer::{UploadSession, split_bytes};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ConvertConfig;
use crate::coordinator::SessionCoordinator;
use crate::engine_api::ConversionEngine;
use crate::error::PipelineError;
use crate::fetcher::{ArtifactFetcher, cleanup_temp_chunks};
use crate::job::JobOrchestrator;
use crate::poller::JobPoller;
use crate::store::{PermanentStore, TempStore};
use crate::types::{Artifact, ConvertEvent, MediaSource, Phase};

/// Orchestrates one media file's conversion into a persisted audio
/// artifact.
///
/// Progress events are sent on the channel returned by
/// [`take_events`](Self::take_events); the caller also receives the final
/// outcome as the return value of [`convert`](Self::convert).
pub struct ConvertOrchestrator {
    config: ConvertConfig,
    events_tx: mpsc::Sender<ConvertEvent>,
    events_rx: Option<mpsc::Receiver<ConvertEvent>>,
    cancel: CancellationToken,
}

impl ConvertOrchestrator {
    /// Creates a new orchestrator with the given configuration.
    pub fn new(config: ConvertConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ConvertEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this conversion.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the full pipeline for one media source.
    ///
    /// Emits a `Completed` or `Failed` event in addition to returning the
    /// outcome.
    pub async fn convert(
        &self,
        source: MediaSource,
        temp: &dyn TempStore,
        permanent: &dyn PermanentStore,
        engine: &dyn ConversionEngine,
    ) -> Result<Artifact, PipelineError> {
        match self.run_session(source, temp, permanent, engine).await {
            Ok(artifact) => {
                info!(path = %artifact.path, size = artifact.size, "conversion completed");
                let _ = self
                    .events_tx
                    .send(ConvertEvent::Completed {
                        path: artifact.path.clone(),
                    })
                    .await;
                Ok(artifact)
            }
            Err(e) => {
                error!(error = %e, "conversion failed");
                let _ = self
                    .events_tx
                    .send(ConvertEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn run_session(
        &self,
        source: MediaSource,
        temp: &dyn TempStore,
        permanent: &dyn PermanentStore,
        engine: &dyn ConversionEngine,
    ) -> Result<Artifact, PipelineError> {
        // Validation fails before any I/O; nothing to clean up yet.
        validate(&source)?;

        let chunks = split_bytes(&source.data, self.config.chunk_size);
        let session = UploadSession::new(
            &source.file_name,
            &source.media_type,
            chunks.len(),
            self.config.namespace.as_deref(),
        );
        info!(
            session = %session.key(),
            chunks = chunks.len(),
            bytes = source.data.len(),
            "starting chunked upload"
        );

        let result = self
            .run_stages(&session, chunks, temp, permanent, engine)
            .await;

        match &result {
            Ok(_) => session.complete(),
            Err(PipelineError::Cancelled) => session.cancel(),
            Err(e) => session.fail(&e.to_string()),
        }

        // Chunk keys are deterministic, so cleanup covers every written
        // chunk regardless of where the pipeline stopped; missing keys are
        // ignored by the store.
        cleanup_temp_chunks(temp, session.key(), &session.chunk_keys()).await;

        result
    }

    async fn run_stages(
        &self,
        session: &UploadSession,
        chunks: Vec<echopress_transfer::Chunk>,
        temp: &dyn TempStore,
        permanent: &dyn PermanentStore,
        engine: &dyn ConversionEngine,
    ) -> Result<Artifact, PipelineError> {
        session.start_upload();
        let _ = self
            .events_tx
            .send(ConvertEvent::Progress {
                phase: Phase::Uploading,
                percent: 0,
            })
            .await;

        let coordinator = SessionCoordinator::new(temp, &self.config.upload_retry, self.cancel.clone());
        let submitter = JobOrchestrator::new(engine, self.config.output.clone());
        let job_id = coordinator
            .run(session, chunks, &submitter, &self.events_tx)
            .await?;

        session.start_converting();
        let poller = JobPoller::new(engine, self.config.poll.clone(), self.cancel.clone());
        let result_url = poller.poll_until_terminal(&job_id, &self.events_tx).await?;

        let fetcher = ArtifactFetcher::new(
            engine,
            permanent,
            &self.config.persist_retry,
            self.cancel.clone(),
        );
        fetcher
            .fetch_and_persist(&result_url, session.artifact_key())
            .await
    }
}

/// Rejects inputs the pipeline cannot process before any I/O happens.
fn validate(source: &MediaSource) -> Result<(), PipelineError> {
    if source.file_name.trim().is_empty() {
        return Err(PipelineError::Validation("missing file name".into()));
    }
    if source.data.is_empty() {
        return Err(PipelineError::Validation("empty source file".into()));
    }
    let media_type = &source.media_type;
    if !(media_type.starts_with("video/") || media_type.starts_with("audio/")) {
        return Err(PipelineError::Validation(format!(
            "unsupported media type: {media_type}"
        )));
    }
    Ok(())
}
