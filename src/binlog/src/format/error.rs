
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, BinlogError>;

/// Errors surfaced by the encoder, the decoder and the csv ingester.
///
/// Per-record corruption during decoding is not an error: the decoder logs a
/// warning, drops the record and resynchronizes. These variants cover the
/// failures that abort an operation.
#[derive(Debug, Error)]
pub enum BinlogError {
    #[error("cannot open {path}: {source}")]
    IoOpenFailed { path: PathBuf, source: io::Error },

    #[error("invalid schema: {0}")]
    SchemaInvalid(String),

    #[error("package id {0} is not registered")]
    NotRegistered(u16),

    #[error("schema block checksum mismatch: computed {computed}, stored {stored}")]
    ChecksumMismatch { computed: u8, stored: u8 },

    #[error("corrupt record at file offset {index_in_file}")]
    RecordCorrupt { index_in_file: u64 },

    #[error("unsupported dynamic item type code {0}")]
    UnsupportedDynamicType(u8),

    #[error("no log file is open")]
    NotOpen,

    #[error("log file header is not recognized")]
    HeaderInvalid,

    #[error(transparent)]
    Io(#[from] io::Error),
}
