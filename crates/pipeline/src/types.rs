//! Data types for the conversion flow.

/// An input media file queued for conversion.
#[derive(Debug, Clone)]
pub struct MediaSource {
    /// Original file name as the user provided it.
    pub file_name: String,
    /// Declared media type, e.g. `video/webm`.
    pub media_type: String,
    pub data: Vec<u8>,
}

/// The persisted audio artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Permanent-storage path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    pub content_type: String,
}

/// Pipeline phase reported with progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uploading,
    Converting,
}

/// Event emitted during a conversion session.
#[derive(Debug, Clone)]
pub enum ConvertEvent {
    /// Progress update for the given phase, in [0, 100].
    Progress { phase: Phase, percent: u8 },
    /// The artifact was persisted successfully.
    Completed { path: String },
    /// The session failed terminally.
    Failed { error: String },
}
