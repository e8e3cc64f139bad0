use std::collections::HashSet;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

/// Lifecycle of an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Uploading,
    Converting,
    Completed,
    Failed,
    Cancelled,
}

/// Tracks one file's end-to-end chunk upload and conversion attempt
/// (thread-safe).
///
/// The session key combines a millisecond timestamp, a random token and the
/// sanitized file name, optionally under a caller-supplied namespace, so
/// concurrent sessions never collide on temporary-storage keys.
pub struct UploadSession {
    key: String,
    artifact_key: String,
    file_name: String,
    media_type: String,
    total_chunks: usize,
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    status: SessionStatus,
    acknowledged: HashSet<usize>,
    completion_seen: bool,
    error: String,
}

impl UploadSession {
    /// Creates a new pending session with a collision-free key.
    pub fn new(
        file_name: &str,
        media_type: &str,
        total_chunks: usize,
        namespace: Option<&str>,
    ) -> Self {
        let sanitized = sanitize_file_name(file_name);
        let token = Uuid::new_v4().simple().to_string();
        let stem = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &token[..8],
            sanitized
        );
        let (key, artifact_key) = match namespace {
            Some(ns) => (format!("{ns}/{stem}"), format!("{ns}/converted-{stem}.mp3")),
            None => (stem.clone(), format!("converted-{stem}.mp3")),
        };

        Self {
            key,
            artifact_key,
            file_name: sanitized,
            media_type: media_type.to_string(),
            total_chunks,
            inner: RwLock::new(SessionInner {
                status: SessionStatus::Pending,
                acknowledged: HashSet::new(),
                completion_seen: false,
                error: String::new(),
            }),
        }
    }

    /// Unique session key, used as the temporary-storage prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Deterministic permanent-storage path for the converted artifact.
    pub fn artifact_key(&self) -> &str {
        &self.artifact_key
    }

    /// Sanitized original file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared media type of the source file.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Total number of chunks for this session.
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    /// Storage key for one chunk, unique per (session, index).
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}/chunk-{}", self.key, index)
    }

    /// All chunk keys for the session, in index order.
    pub fn chunk_keys(&self) -> Vec<String> {
        (0..self.total_chunks).map(|i| self.chunk_key(i)).collect()
    }

    /// Records an acknowledged chunk write.
    ///
    /// Returns `true` exactly once: when the final missing index arrives and
    /// the session becomes complete. Duplicate acknowledgements and any
    /// later calls return `false`, so job submission can be keyed off this
    /// edge without extra bookkeeping.
    pub fn mark_acknowledged(&self, index: usize) -> bool {
        let mut s = self.inner.write().unwrap();
        s.acknowledged.insert(index);
        if s.acknowledged.len() == self.total_chunks && !s.completion_seen {
            s.completion_seen = true;
            true
        } else {
            false
        }
    }

    /// Number of chunks acknowledged so far.
    pub fn acknowledged_count(&self) -> usize {
        self.inner.read().unwrap().acknowledged.len()
    }

    /// Returns `true` once every chunk has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.acknowledged_count() == self.total_chunks
    }

    /// Upload progress in [0, 100].
    pub fn progress_percent(&self) -> u8 {
        if self.total_chunks == 0 {
            return 100;
        }
        let done = self.acknowledged_count();
        ((done as f64 / self.total_chunks as f64) * 100.0).round() as u8
    }

    /// Marks the session as uploading chunks.
    pub fn start_upload(&self) {
        self.inner.write().unwrap().status = SessionStatus::Uploading;
    }

    /// Marks the session as waiting on the conversion job.
    pub fn start_converting(&self) {
        self.inner.write().unwrap().status = SessionStatus::Converting;
    }

    /// Marks the session as completed.
    pub fn complete(&self) {
        self.inner.write().unwrap().status = SessionStatus::Completed;
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&self, err: &str) {
        let mut s = self.inner.write().unwrap();
        s.status = SessionStatus::Failed;
        s.error = err.to_string();
    }

    /// Marks the session as cancelled.
    pub fn cancel(&self) {
        self.inner.write().unwrap().status = SessionStatus::Cancelled;
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.inner.read().unwrap().status.clone()
    }

    /// Last recorded error message (empty if none).
    pub fn error(&self) -> String {
        self.inner.read().unwrap().error.clone()
    }

    /// Returns `true` while the session has not reached a terminal state.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status(),
            SessionStatus::Pending | SessionStatus::Uploading | SessionStatus::Converting
        )
    }
}

/// Collapses whitespace runs in a file name to single underscores.
pub fn sanitize_file_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
