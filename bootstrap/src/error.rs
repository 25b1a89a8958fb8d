//! The bootstrap error taxonomy.
//!
//! Every variant records the [`Stage`] that failed together with the path,
//! URL or extension name involved and the underlying cause, so the final
//! error still says which strategy was running when the chain gave up.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use extload_core::{ConfigError, Deadline, HostError, PlatformError};
use extload_fetch::{DownloadError, UnpackError};
use thiserror::Error;

/// One step of the acquisition fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The environment precondition checked before anything else.
    Configuration,
    /// Loading an already installed or bundled extension by name.
    DirectLoad,
    /// Installing from the operator-supplied override path.
    OverridePath,
    /// Installing from a caller-provided local file.
    ProvidedFile,
    /// Fetching from a caller-supplied URL.
    SourceUri,
    /// Fetching from the artifact store.
    Remote,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Configuration => "configuration",
            Stage::DirectLoad => "direct load",
            Stage::OverridePath => "override path",
            Stage::ProvidedFile => "provided file",
            Stage::SourceUri => "source uri",
            Stage::Remote => "remote fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a bootstrap attempt.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The credential marker is missing or the configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// No artifact is published for this host.
    #[error("{stage} stage: {source}")]
    UnsupportedPlatform {
        stage: Stage,
        #[source]
        source: PlatformError,
    },

    #[error("{stage} stage: {source}")]
    Download {
        stage: Stage,
        #[source]
        source: DownloadError,
    },

    #[error("{stage} stage: {source}")]
    Unpack {
        stage: Stage,
        #[source]
        source: UnpackError,
    },

    /// Installing the binary failed; load was not attempted.
    #[error("{stage} stage: failed to install '{}': {source}", path.display())]
    Install {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: HostError,
    },

    /// The binary installed but the engine refused to load it.
    #[error("{stage} stage: failed to load extension '{name}': {source}")]
    Load {
        stage: Stage,
        name: String,
        #[source]
        source: HostError,
    },

    /// The caller's overall timeout expired before or during `stage`.
    #[error("{stage} stage: timed out after {elapsed:?}")]
    TimedOut { stage: Stage, elapsed: Duration },
}

impl BootstrapError {
    pub(crate) fn timed_out(stage: Stage, deadline: &Deadline) -> Self {
        BootstrapError::TimedOut {
            stage,
            elapsed: deadline.elapsed(),
        }
    }

    /// The stage that was running when the attempt failed.
    pub fn stage(&self) -> Stage {
        match self {
            BootstrapError::Configuration(_) => Stage::Configuration,
            BootstrapError::UnsupportedPlatform { stage, .. }
            | BootstrapError::Download { stage, .. }
            | BootstrapError::Unpack { stage, .. }
            | BootstrapError::Install { stage, .. }
            | BootstrapError::Load { stage, .. }
            | BootstrapError::TimedOut { stage, .. } => *stage,
        }
    }

    /// What an operator can do about this failure.
    pub fn remediation(&self) -> &'static str {
        match self {
            BootstrapError::Configuration(ConfigError::MissingLicense { .. }) => {
                "set the license environment variable named above and retry"
            }
            BootstrapError::Configuration(_) => "fix the configuration value named above",
            BootstrapError::UnsupportedPlatform { .. } => {
                "build the extension for this platform and set the *_EXTENSION_PATH override to the binary"
            }
            BootstrapError::Download { .. } => {
                "check network connectivity and the artifact base URL, or supply a local extension file"
            }
            BootstrapError::Unpack { .. } => {
                "the downloaded artifact is damaged or has an unexpected layout; supply a local extension file"
            }
            BootstrapError::Install { stage: Stage::OverridePath, .. } => {
                "point the *_EXTENSION_PATH override at an existing, readable extension binary or unset it"
            }
            BootstrapError::Install { .. } => {
                "check permissions on the extension store directory"
            }
            BootstrapError::Load { .. } => {
                "the extension binary does not match this engine build; install a binary built for this engine version"
            }
            BootstrapError::TimedOut { .. } => {
                "raise the timeout or supply a local extension file"
            }
        }
    }
}

/// Convenience alias for results with [`BootstrapError`].
pub type Result<T> = std::result::Result<T, BootstrapError>;
