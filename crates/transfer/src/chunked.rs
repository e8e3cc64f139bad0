use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// A contiguous slice of source-file data queued for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Zero-based position within the file.
    pub index: usize,
    /// Total number of chunks for the file.
    pub total: usize,
    /// Raw chunk data.
    pub data: Vec<u8>,
    /// SHA-256 hex checksum of `data`.
    pub checksum: String,
}

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Divides `data` into fixed-size chunks.
///
/// Every chunk holds `chunk_size` bytes except the last, which holds the
/// remainder (or a full `chunk_size` when the input divides evenly). A
/// non-empty input below the threshold still yields exactly one chunk;
/// an empty input yields none. Concatenating the chunks in index order
/// reproduces `data` exactly.
///
/// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
pub fn split_bytes(data: &[u8], chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    let total = data.len().div_ceil(chunk_size);

    let mut chunks = Vec::with_capacity(total);
    for (index, piece) in data.chunks(chunk_size).enumerate() {
        chunks.push(Chunk {
            index,
            total,
            checksum: checksum_bytes(piece),
            data: piece.to_vec(),
        });
    }
    chunks
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file as indexed fixed-size chunks without loading it whole.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: usize,
    index: usize,
    total: usize,
    file_size: u64,
    bytes_read: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            index: 0,
            total: (file_size as usize).div_ceil(chunk_size),
            file_size,
            bytes_read: 0,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.file_size - self.bytes_read;
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = std::cmp::min(remaining as usize, self.chunk_size);
        let mut buf = vec![0u8; read_size];
        self.file.read_exact(&mut buf)?;

        let chunk = Chunk {
            index: self.index,
            total: self.total,
            checksum: checksum_bytes(&buf),
            data: buf,
        };
        self.index += 1;
        self.bytes_read += read_size as u64;
        Ok(Some(chunk))
    }

    /// Total number of chunks the file divides into.
    pub fn total_chunks(&self) -> usize {
        self.total
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size - self.bytes_read
    }
}
