//! Bootstrap a native extension into a database session.
//!
//! [`Bootstrap`] walks a fixed fallback chain until the extension is loaded:
//!
//! 1. load it by name, in case it is already installed or bundled;
//! 2. install from the `*_EXTENSION_PATH` override, if set (fatal on failure);
//! 3. install from a caller-provided file, if it exists;
//! 4. fetch, unpack and install from a caller-supplied URL or the artifact
//!    store.
//!
//! Every failure is a [`BootstrapError`] that names the [`Stage`] it came
//! from and carries an operator [`remediation`](BootstrapError::remediation).
//!
//! The engine is reached only through [`extload_core::ExtensionHost`] and the
//! network only through an injected [`extload_fetch::Fetcher`], so both can
//! be replaced in tests.

pub mod error;
mod installer;
mod locator;
mod orchestrator;

pub use error::{BootstrapError, Result, Stage};
pub use installer::install_and_load;
pub use locator::{ArtifactLocator, Strategy};
pub use orchestrator::{Bootstrap, Loaded};
