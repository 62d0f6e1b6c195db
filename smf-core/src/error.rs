use std::io;

use thiserror::Error;

/// Failures of the manifest and download-state codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("short header: fewer than 6 bytes available")]
    ShortHeader,

    #[error("unrecognized format (magic {found:02x?})")]
    UnrecognizedFormat { found: [u8; 4] },

    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u8),

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("fetch {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },
}

impl CodecError {
    /// Map a structured-decoder failure: real I/O stays `Io`, anything else
    /// (including a payload that ends early) is a corrupt payload.
    pub(crate) fn from_bincode(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(err) if err.kind() != io::ErrorKind::UnexpectedEof => {
                CodecError::Io(err)
            }
            other => CodecError::CorruptPayload(other.to_string()),
        }
    }

    pub(crate) fn from_json(e: serde_json::Error) -> Self {
        if e.is_io() {
            CodecError::Io(io::Error::from(e))
        } else {
            CodecError::CorruptPayload(e.to_string())
        }
    }
}

/// Violations of the manifest data-model invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("block size must be non-zero")]
    ZeroBlockSize,

    #[error("block index {index} out of range (resource has {count} blocks)")]
    BlockOutOfRange { index: u64, count: u64 },

    #[error("duplicate block index {0}")]
    DuplicateIndex(u64),

    #[error("manifest incomplete: {missing} block(s) missing")]
    Incomplete { missing: usize },

    #[error("URI blocks need a base URI")]
    MissingUriBase,
}

/// Failures while building a manifest from local bytes.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Failures while materialising a resource from its manifest.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("block {0} data is not a valid URI")]
    BadUri(u64),
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;
