//! Chunk splitting and upload session state for media conversion uploads.
//!
//! A source file is divided into fixed-size indexed chunks; an
//! [`UploadSession`] tracks which chunk writes have been acknowledged and
//! detects the completion edge that triggers job submission.

mod chunked;
mod session;

pub use chunked::{Chunk, ChunkReader, checksum_bytes, split_bytes};
pub use session::{SessionStatus, UploadSession, sanitize_file_name};

/// Default chunk size: 5 MiB.
///
/// The largest payload a single temporary-storage write accepts. The
/// pipeline overrides this per session via its configuration.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
