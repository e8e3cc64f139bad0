//! Chunked upload and conversion orchestration.
//!
//! This crate implements the **business logic** for turning a large media
//! file into a compressed audio artifact. It is a library crate with no UI
//! or transport dependencies: callers provide the storage and engine
//! collaborators and observe progress through an event channel.
//!
//! # Pipeline
//!
//! 1. **Validate** — reject empty or non-media inputs before any I/O
//! 2. **Upload** — send chunks strictly in order with bounded retry/backoff
//! 3. **Submit** — ask the engine to combine and convert (exactly once,
//!    after the last acknowledged chunk)
//! 4. **Poll** — drive the job to a terminal state under a hard attempt
//!    ceiling
//! 5. **Persist** — download, verify and store the artifact
//! 6. **Cleanup** — best-effort removal of temporary chunks

pub mod config;
pub mod coordinator;
pub mod engine_api;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod orchestrator;
pub mod poller;
pub mod retry;
pub mod store;
pub mod types;

// Re-export primary types for convenience.
pub use config::{ConvertConfig, PollConfig};
pub use coordinator::SessionCoordinator;
pub use engine_api::ConversionEngine;
pub use error::PipelineError;
pub use fetcher::{ArtifactFetcher, cleanup_temp_chunks};
pub use job::JobOrchestrator;
pub use orchestrator::ConvertOrchestrator;
pub use poller::JobPoller;
pub use retry::{RetryError, RetryPolicy};
pub use store::{MemoryStore, OverwritePolicy, PermanentStore, StoreError, TempStore};
pub use types::{Artifact, ConvertEvent, MediaSource, Phase};
