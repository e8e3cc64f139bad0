//! Raw engine schema and its translation into pipeline-internal job state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target audio parameters for a conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputParams {
    pub codec: String,
    pub bitrate: String,
    pub sample_rate: u32,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            codec: "mp3".into(),
            bitrate: "128k".into(),
            sample_rate: 44_100,
        }
    }
}

/// Request to convert an assembled upload into an audio artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    /// Locator of the uploaded source (the session's temporary prefix).
    pub source_url: String,
    /// Original file name, forwarded for the engine's import step.
    pub file_name: String,
    /// Declared media type of the source.
    pub media_type: String,
    /// Number of chunks the source was uploaded as.
    pub chunk_count: usize,
    pub output: OutputParams,
}

/// A downloaded conversion result before persistence.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub data: Vec<u8>,
    /// Content type reported by the result endpoint, when present.
    pub content_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Raw engine schema
// ---------------------------------------------------------------------------

/// Envelope wrapping every job response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobEnvelope {
    pub data: RawJob,
}

/// A job as the engine reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    pub id: String,
    /// `waiting`, `processing`, `finished` or `error`.
    pub status: String,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

/// One sub-task of a job (import, convert, export).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTask {
    pub operation: String,
    pub status: String,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<RawTaskResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTaskResult {
    #[serde(default)]
    pub files: Vec<RawResultFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResultFile {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Internal job state
// ---------------------------------------------------------------------------

/// Pipeline-internal view of a job, decoupled from the engine schema.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Running { progress: u8 },
    Succeeded { result_url: String },
    Failed { code: String, message: String },
}

/// A translated point-in-time observation of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: String,
    pub state: JobState,
}

const TASK_FINISHED: &str = "finished";
const TASK_PROCESSING: &str = "processing";
const TASK_ERROR: &str = "error";

impl JobSnapshot {
    /// Translates a raw job payload into the internal state.
    ///
    /// An overall `finished` report is only a success when every sub-task is
    /// finished and an export URL is present; a finished job with sub-tasks
    /// still running is reported as running at 90% so polling continues, and
    /// a finished job with no result locator is a failure, never a success.
    pub fn from_raw(raw: &RawJob) -> Self {
        let state = match raw.status.as_str() {
            TASK_ERROR => {
                let failed = raw.tasks.iter().find(|t| t.status == TASK_ERROR);
                JobState::Failed {
                    code: failed
                        .and_then(|t| t.code.clone())
                        .unwrap_or_else(|| "UNKNOWN_ERROR".into()),
                    message: failed
                        .and_then(|t| t.message.clone())
                        .unwrap_or_else(|| "conversion job failed".into()),
                }
            }
            "waiting" | TASK_PROCESSING => JobState::Running {
                progress: task_progress(&raw.tasks),
            },
            TASK_FINISHED => {
                if !raw.tasks.iter().all(|t| t.status == TASK_FINISHED) {
                    JobState::Running { progress: 90 }
                } else {
                    match export_url(&raw.tasks) {
                        Some(url) => JobState::Succeeded { result_url: url },
                        None => JobState::Failed {
                            code: "RESULT_MISSING".into(),
                            message: "job finished without a result locator".into(),
                        },
                    }
                }
            }
            other => JobState::Failed {
                code: "UNEXPECTED_STATUS".into(),
                message: format!("unexpected job status: {other}"),
            },
        };

        Self {
            job_id: raw.id.clone(),
            state,
        }
    }
}

/// Progress estimate over sub-task states: finished tasks count fully,
/// in-progress tasks count half.
fn task_progress(tasks: &[RawTask]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let finished = tasks.iter().filter(|t| t.status == TASK_FINISHED).count() as f64;
    let processing = tasks.iter().filter(|t| t.status == TASK_PROCESSING).count() as f64;
    (((finished + 0.5 * processing) / tasks.len() as f64) * 100.0).round() as u8
}

fn export_url(tasks: &[RawTask]) -> Option<String> {
    tasks
        .iter()
        .find(|t| t.operation == "export/url")
        .and_then(|t| t.result.as_ref())
        .and_then(|r| r.files.first())
        .map(|f| f.url.clone())
}

// ---------------------------------------------------------------------------
// Failure categories
// ---------------------------------------------------------------------------

/// User-facing category for a failed conversion, mapped from the engine's
/// sub-task error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    SourceDownload,
    Conversion,
    ResultUpload,
    UnsupportedFormat,
    Other,
}

impl FailureCategory {
    /// Maps an engine error code to a category; unrecognized codes fall
    /// back to [`FailureCategory::Other`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "DOWNLOAD_FAILED" => Self::SourceDownload,
            "CONVERSION_FAILED" => Self::Conversion,
            "UPLOAD_FAILED" | "RESULT_MISSING" => Self::ResultUpload,
            "INVALID_FILE" => Self::UnsupportedFormat,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SourceDownload => "source download failed",
            Self::Conversion => "conversion failed",
            Self::ResultUpload => "result upload failed",
            Self::UnsupportedFormat => "unsupported format",
            Self::Other => "conversion error",
        };
        f.write_str(label)
    }
}
