//! Abstract conversion engine driven by the pipeline.

use async_trait::async_trait;
use echopress_engine::{Client, EngineError, FetchedArtifact, JobSnapshot, JobSpec};

/// The engine contract the pipeline is written against.
///
/// [`echopress_engine::Client`] implements this over the real HTTP API;
/// tests substitute scripted mocks. Using a trait keeps orchestration logic
/// decoupled from the third-party schema and testable without a network.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Submits a job; returns its opaque identifier.
    async fn submit(&self, spec: &JobSpec) -> Result<String, EngineError>;

    /// Reads the job's current, already-translated status.
    async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError>;

    /// Downloads a finished job's result.
    async fn fetch_result(&self, url: &str) -> Result<FetchedArtifact, EngineError>;
}

#[async_trait]
impl ConversionEngine for Client {
    async fn submit(&self, spec: &JobSpec) -> Result<String, EngineError> {
        Client::submit(self, spec).await
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError> {
        Client::status(self, job_id).await
    }

    async fn fetch_result(&self, url: &str) -> Result<FetchedArtifact, EngineError> {
        Client::fetch_result(self, url).await
    }
}
