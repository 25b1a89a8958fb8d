//! Leaf error types shared by every bootstrap crate.
//!
//! These cover the failure modes that do not depend on network or archive
//! handling: platform resolution, environment configuration, the engine
//! host, and query templating/execution.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed engine-specific error carried by [`HostError::Engine`].
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The host operating system or architecture has no published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The raw strings are kept for diagnostics.
    #[error("unsupported platform: os '{os}', arch '{arch}'")]
    Unsupported { os: String, arch: String },
}

/// Environment or configuration file problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The required credential marker is absent or empty.
    #[error(
        "{var} environment variable not set; export your license key as {var} before connecting"
    )]
    MissingLicense { var: String },

    /// Configuration file could not be read or written.
    #[error("I/O error on config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`BootstrapConfig`](crate::BootstrapConfig).
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configuration value failed validation.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors reported by the database engine collaborator.
#[derive(Debug, Error)]
pub enum HostError {
    /// The extension (or the file to install) does not exist.
    #[error("extension not found: {0}")]
    NotFound(String),

    /// An extension with the same name is installed and overwrite was not
    /// requested.
    #[error("extension already installed at '{}'", .0.display())]
    AlreadyInstalled(PathBuf),

    /// Filesystem failure inside the extension store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine rejected the operation.
    #[error("engine error: {0}")]
    Engine(#[source] EngineError),
}

impl HostError {
    /// Returns `true` for the "not found" class that lets a direct load fall
    /// through to the acquisition strategies.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }
}

/// Placeholder substitution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder names a variable that was not supplied.
    #[error("missing key '{0}' in query")]
    MissingKey(String),

    /// A `$` is not followed by `$`, an identifier, or `{identifier}`.
    #[error("invalid placeholder in query: line {line}, col {column}")]
    Malformed { line: usize, column: usize },

    /// Any other substitution failure.
    #[error("unknown template error: {0}")]
    Unknown(String),
}

/// Failures of [`run`](crate::run) and [`run_file`](crate::run_file).
#[derive(Debug, Error)]
pub enum QueryError {
    /// The script file could not be read.
    #[error("failed to read query file '{}': {source}", path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Placeholder substitution failed; nothing was executed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The engine failed to execute the script. Passed through untouched.
    #[error(transparent)]
    Execution(HostError),
}
