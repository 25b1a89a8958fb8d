//! Error types for downloading and unpacking artifacts.

use std::path::PathBuf;

use thiserror::Error;

/// A download failed. The URL is always kept for diagnostics.
#[derive(Debug, Error)]
#[error("failed to download '{url}': {cause}")]
pub struct DownloadError {
    pub url: String,
    #[source]
    pub cause: DownloadCause,
}

impl DownloadError {
    pub fn new(url: impl Into<String>, cause: DownloadCause) -> Self {
        Self {
            url: url.into(),
            cause,
        }
    }
}

/// Why a download failed.
#[derive(Debug, Error)]
pub enum DownloadCause {
    /// DNS, connection, TLS or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Writing the scratch file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact digest did not match the configured one.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The caller's deadline passed before the body was fully read.
    #[error("timed out")]
    TimedOut,
}

/// Unpacking an artifact did not produce the expected binary.
#[derive(Debug, Error)]
#[error("failed to unpack '{}': {reason}", path.display())]
pub struct UnpackError {
    pub path: PathBuf,
    #[source]
    pub reason: UnpackReason,
}

impl UnpackError {
    pub fn new(path: impl Into<PathBuf>, reason: UnpackReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

/// Why unpacking failed.
#[derive(Debug, Error)]
pub enum UnpackReason {
    /// Reading the artifact or writing the output failed, including corrupt
    /// gzip streams.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The zip archive has no entry with the expected name.
    #[error("archive has no entry named '{0}'")]
    MissingEntry(String),

    /// The expected entry name is not a plain file name.
    #[error("invalid entry name '{0}'")]
    InvalidEntryName(String),

    /// The output path is the artifact itself.
    #[error("output '{}' would overwrite the artifact", .0.display())]
    OverwritesArtifact(PathBuf),

    /// Unpacking finished but the output file is absent or empty.
    #[error("missing output")]
    MissingOutput,

    /// The caller's deadline passed mid-unpack.
    #[error("timed out")]
    TimedOut,
}
