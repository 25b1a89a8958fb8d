//! Remote artifact download into a scoped scratch directory.
//!
//! Every fetch creates a fresh temporary directory owned by the returned
//! [`FetchedArtifact`]. Dropping the artifact removes the directory, so
//! scratch space is released on success, on error, and when a deadline
//! expires. Partial downloads never outlive the failed call.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use extload_core::{ArtifactDescriptor, Deadline};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::copy::copy_with_deadline;
use crate::error::{DownloadCause, DownloadError};

/// `User-Agent` sent with artifact requests.
pub const USER_AGENT: &str = concat!("extload/", env!("CARGO_PKG_VERSION"));

/// A downloaded artifact and the scratch directory holding it.
#[derive(Debug)]
pub struct FetchedArtifact {
    scratch: TempDir,
    path: PathBuf,
    sha256: String,
}

impl FetchedArtifact {
    /// Wraps a file already written inside `scratch`.
    pub fn new(scratch: TempDir, path: PathBuf, sha256: String) -> Self {
        Self {
            scratch,
            path,
            sha256,
        }
    }

    /// Path of the downloaded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory; unpacked output belongs here too.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Lowercase hex SHA-256 of the downloaded bytes.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

/// Creates a fresh scratch directory for one attempt.
pub fn scratch_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("extload-").tempdir()
}

/// Retrieves an artifact described by an [`ArtifactDescriptor`].
///
/// Implementations must download to a scratch location scoped to the call
/// and report every failure as a [`DownloadError`] naming the URL.
pub trait Fetcher {
    fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        deadline: &Deadline,
    ) -> Result<FetchedArtifact, DownloadError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        deadline: &Deadline,
    ) -> Result<FetchedArtifact, DownloadError> {
        (**self).fetch(descriptor, deadline)
    }
}

/// HTTP(S) fetcher backed by a reusable blocking [`reqwest`] client.
///
/// Construct once per process and share by reference so connections are
/// pooled across attempts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    ///
    /// # Errors
    ///
    /// Returns the client builder's error if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Uses an existing client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn download(
        &self,
        url: &str,
        target: &Path,
        deadline: &Deadline,
    ) -> Result<String, DownloadCause> {
        if deadline.is_expired() {
            return Err(DownloadCause::TimedOut);
        }

        let mut request = self.client.get(url);
        if let Some(left) = deadline.remaining() {
            request = request.timeout(left);
        }
        let mut response = request.send().map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadCause::Status(status.as_u16()));
        }

        let mut hasher = Sha256::new();
        let mut writer = BufWriter::new(File::create(target)?);
        let bytes = copy_with_deadline(&mut response, &mut writer, deadline, |chunk| {
            hasher.update(chunk)
        })
        .map_err(|err| {
            // The client reports its own read timeout as a generic I/O error.
            if err.kind() == io::ErrorKind::TimedOut || deadline.is_expired() {
                DownloadCause::TimedOut
            } else {
                DownloadCause::Io(err)
            }
        })?;

        let digest = format!("{:x}", hasher.finalize());
        debug!(url, bytes, sha256 = %digest, "downloaded artifact");
        Ok(digest)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        deadline: &Deadline,
    ) -> Result<FetchedArtifact, DownloadError> {
        let url = descriptor.source_url.as_str();
        let fail = |cause| DownloadError::new(url, cause);

        let scratch = scratch_dir().map_err(|err| fail(DownloadCause::Io(err)))?;
        let path = scratch.path().join(&descriptor.filename);

        info!(url, "fetching extension artifact");
        let digest = self.download(url, &path, deadline).map_err(fail)?;

        if let Some(expected) = &descriptor.sha256 {
            if *expected != digest {
                return Err(fail(DownloadCause::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: digest,
                }));
            }
        }

        Ok(FetchedArtifact::new(scratch, path, digest))
    }
}

fn classify_transport(err: reqwest::Error) -> DownloadCause {
    if err.is_timeout() {
        DownloadCause::TimedOut
    } else {
        DownloadCause::Transport(err)
    }
}
