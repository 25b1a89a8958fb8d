//! The database engine surface consumed by the bootstrap.
//!
//! The engine itself is an external collaborator: a session is opened by the
//! caller, handed to the bootstrap by mutable reference, and returned with
//! the extension installed and loaded. Implementations are not required to
//! be thread-safe; callers serialize bootstrap attempts per session.

use std::path::{Path, PathBuf};

use crate::error::HostError;

/// Operations a database session must expose to have an extension
/// bootstrapped into it.
pub trait ExtensionHost {
    /// Result of executing a SQL script.
    type Output;

    /// Installs the extension binary at `path` into the engine's extension
    /// store, returning the installed location.
    ///
    /// With `force` set, a previously installed extension of the same name
    /// is replaced. Without it, an existing one is
    /// [`HostError::AlreadyInstalled`].
    fn install_extension(&mut self, path: &Path, force: bool) -> Result<PathBuf, HostError>;

    /// Loads an installed extension by logical name into this session.
    ///
    /// Returns [`HostError::NotFound`] when no installed extension of that
    /// name exists on the engine's search path.
    fn load_extension(&mut self, name: &str) -> Result<(), HostError>;

    /// Executes `sql` exactly as given.
    fn execute(&mut self, sql: &str) -> Result<Self::Output, HostError>;
}

impl<H: ExtensionHost + ?Sized> ExtensionHost for &mut H {
    type Output = H::Output;

    fn install_extension(&mut self, path: &Path, force: bool) -> Result<PathBuf, HostError> {
        (**self).install_extension(path, force)
    }

    fn load_extension(&mut self, name: &str) -> Result<(), HostError> {
        (**self).load_extension(name)
    }

    fn execute(&mut self, sql: &str) -> Result<Self::Output, HostError> {
        (**self).execute(sql)
    }
}
