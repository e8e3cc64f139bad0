//! Conversion engine API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{FetchedArtifact, JobSnapshot, JobSpec, RawJobEnvelope};

const DEFAULT_BASE_URL: &str = "https://api.cloudconvert.com/v2";

/// Errors from the conversion engine client.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Rate-limit or quota rejection, not retryable on a useful timescale.
    #[error("engine quota exhausted ({status}): {body}")]
    Quota { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,
}

/// Conversion engine API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client with the given API key.
    pub fn new(api_key: &str) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| EngineError::InvalidKey)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Submits a conversion job and returns its opaque identifier.
    ///
    /// HTTP 402/429 responses are surfaced as [`EngineError::Quota`]; any
    /// other non-success status is a rejection.
    pub async fn submit(&self, spec: &JobSpec) -> Result<String, EngineError> {
        let body = build_job_request(spec);
        let resp = self
            .http
            .post(format!("{}/jobs", self.base_url))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let envelope: RawJobEnvelope = serde_json::from_slice(&resp.bytes().await?)?;
        debug!(job = %envelope.data.id, file = %spec.file_name, "conversion job submitted");
        Ok(envelope.data.id)
    }

    /// Reads a job's current status, translated into a [`JobSnapshot`].
    pub async fn status(&self, job_id: &str) -> Result<JobSnapshot, EngineError> {
        let resp = self
            .http
            .get(format!("{}/jobs/{job_id}", self.base_url))
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), body));
        }

        let envelope: RawJobEnvelope = serde_json::from_slice(&resp.bytes().await?)?;
        Ok(JobSnapshot::from_raw(&envelope.data))
    }

    /// Downloads a finished job's result from its export URL.
    pub async fn fetch_result(&self, url: &str) -> Result<FetchedArtifact, EngineError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(api_error(status.as_u16(), "result download failed".into()));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Ok(FetchedArtifact {
            data: resp.bytes().await?.to_vec(),
            content_type,
        })
    }
}

fn api_error(status: u16, body: String) -> EngineError {
    if status == 402 || status == 429 {
        EngineError::Quota { status, body }
    } else {
        EngineError::Rejected { status, body }
    }
}

/// Builds the engine's job request: import the uploaded source, convert it
/// to audio, export the result by URL.
fn build_job_request(spec: &JobSpec) -> serde_json::Value {
    serde_json::json!({
        "tasks": {
            "import-source": {
                "operation": "import/url",
                "url": spec.source_url,
                "filename": spec.file_name,
                "content_type": spec.media_type,
                "chunks": spec.chunk_count,
            },
            "convert-audio": {
                "operation": "convert",
                "input": "import-source",
                "output_format": "mp3",
                "audio_codec": spec.output.codec,
                "audio_bitrate": spec.output.bitrate,
                "audio_frequency": spec.output.sample_rate,
            },
            "export-result": {
                "operation": "export/url",
                "input": "convert-audio",
            },
        },
    })
}
