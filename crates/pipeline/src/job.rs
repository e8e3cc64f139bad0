//! Job submission to the conversion engine.

use echopress_engine::{JobSpec, OutputParams};
use echopress_transfer::UploadSession;
use tracing::{info, warn};

use crate::engine_api::ConversionEngine;
use crate::error::PipelineError;

/// Submits an assembled upload to the conversion engine.
///
/// Submission happens exactly once per session, keyed off the session's
/// completion edge; rejections are terminal and never polled.
pub struct JobOrchestrator<'a> {
    engine: &'a dyn ConversionEngine,
    output: OutputParams,
}

impl<'a> JobOrchestrator<'a> {
    pub fn new(engine: &'a dyn ConversionEngine, output: OutputParams) -> Self {
        Self { engine, output }
    }

    /// Asks the engine to combine the session's chunks and produce audio.
    pub async fn submit(&self, session: &UploadSession) -> Result<String, PipelineError> {
        let spec = JobSpec {
            source_url: session.key().to_string(),
            file_name: session.file_name().to_string(),
            media_type: session.media_type().to_string(),
            chunk_count: session.total_chunks(),
            output: self.output.clone(),
        };

        match self.engine.submit(&spec).await {
            Ok(job_id) => {
                info!(
                    session = %session.key(),
                    job = %job_id,
                    chunks = spec.chunk_count,
                    "conversion job submitted"
                );
                Ok(job_id)
            }
            Err(e) => {
                warn!(session = %session.key(), error = %e, "job submission rejected");
                Err(PipelineError::from(e))
            }
        }
    }
}
