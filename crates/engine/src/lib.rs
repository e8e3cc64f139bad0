//! Conversion engine API client and job status schema.
//!
//! Async client for a CloudConvert-style job API with Bearer token
//! authentication, plus the translation from the engine's raw status
//! payload into the tagged [`JobState`] the pipeline consumes. The raw
//! schema never leaks past this crate.

pub mod client;
pub mod types;

pub use client::{Client, EngineError};
pub use types::{
    FailureCategory, FetchedArtifact, JobSnapshot, JobSpec, JobState, OutputParams, RawJob,
    RawTask,
};
