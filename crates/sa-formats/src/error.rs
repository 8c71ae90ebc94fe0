//! Decode and encode errors.

use thiserror::Error;

/// Convenient result alias for module decoding and encoding.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors raised while reading or writing a module.
///
/// Decoding never yields a partial module: any of these aborts the whole
/// decode.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input shorter than the 4-byte magic.
    #[error("input too short to contain a module ({len} bytes)")]
    TooShort {
        /// Length of the rejected input.
        len: usize,
    },
    /// Legacy scan found no `0x00000028` marker.
    #[error("no Sonic Arranger structure marker found")]
    MarkerNotFound,
    /// Tagged stream contains a chunk tag outside the known set.
    #[error("unknown chunk '{tag}' at offset 0x{offset:x}")]
    UnknownChunk {
        /// Tag as text, lossily decoded.
        tag: String,
        /// Offset of the tag inside the input.
        offset: u64,
    },
    /// The `deadbeef` sentinel after the legacy sample table is absent.
    #[error("missing deadbeef sentinel after sample data")]
    MissingSentinel,
    /// Legacy header does not carry the expected marker word.
    #[error("malformed legacy header")]
    BadHeader,
    /// Legacy offset table is not monotonically non-decreasing.
    #[error("legacy offset table decreases at {table}")]
    NonMonotonicOffsets {
        /// Name of the table whose start precedes the previous one.
        table: &'static str,
    },
    /// A table or field runs past the end of the input.
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// A table is too large to be described by a 32-bit count.
    #[error("{table} table too large to encode")]
    TableTooLarge {
        /// Name of the offending table.
        table: &'static str,
    },
    /// Writing the legacy offset-table form is not supported.
    #[error("encoding to the legacy offset-table form is not supported")]
    UnsupportedEncoding,
    /// Record-level decode failure.
    #[error("record decode failed: {0}")]
    Record(binrw::Error),
    /// I/O failure while writing.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(e: binrw::Error) -> Self {
        if e.is_eof() {
            FormatError::UnexpectedEof
        } else {
            FormatError::Record(e)
        }
    }
}
