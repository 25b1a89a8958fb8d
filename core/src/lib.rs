//! Core types for bootstrapping a native extension into a database session.
//!
//! This crate holds everything that does not touch the network or archives:
//!
//! - [`PlatformTag`]: resolution of the host OS and CPU architecture to a
//!   canonical distribution tag.
//! - [`ArtifactDescriptor`]: deterministic naming of the remote artifact and
//!   the binary inside it, plus the caller's [`AcquisitionHint`].
//! - [`ExtensionHost`]: the engine operations a session must expose
//!   (install, load, execute).
//! - [`EnvSnapshot`] and [`BootstrapConfig`]: environment variables and YAML
//!   configuration.
//! - [`Deadline`]: the overall time budget of one attempt.
//! - [`run`] / [`run_file`]: `$`-placeholder SQL templating.
//!
//! # Example
//!
//! ```
//! use extload_core::*;
//!
//! let config = BootstrapConfig::new("exondb", "0.3.9");
//! let env = EnvSnapshot::empty(config.env_keys()).with_license("key");
//! assert!(env.require_license().is_ok());
//!
//! let tag = PlatformTag::resolve_from("darwin", "arm64", config.compatibility).unwrap();
//! let descriptor = ArtifactDescriptor::new(
//!     &config.name,
//!     &config.version,
//!     tag,
//!     config.format,
//!     &config.base_url(&env),
//! );
//! assert!(descriptor.source_url.ends_with("/osx_arm64/exondb-0.3.9-osx-arm64.gz"));
//! ```

mod config;
mod deadline;
mod descriptor;
mod error;
mod host;
mod platform;
mod template;

pub use config::{BootstrapConfig, DEFAULT_TIER, EnvKeys, EnvSnapshot};
pub use deadline::Deadline;
pub use descriptor::{AcquisitionHint, ArchiveFormat, ArtifactDescriptor};
pub use error::{ConfigError, EngineError, HostError, PlatformError, QueryError, TemplateError};
pub use host::ExtensionHost;
pub use platform::{Arch, Compatibility, LEGACY_ABI_VARIANT, Os, PlatformTag};
pub use template::{TemplateContext, render, run, run_file};
