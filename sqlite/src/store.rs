//! On-disk store of installed extension binaries.
//!
//! The store is a flat directory holding one `{name}.{so|dylib|dll}` file per
//! extension. Installs copy into a temporary file inside the store and then
//! rename it over the target, so a reader never sees a half-written binary.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use extload_core::HostError;
use tracing::debug;

/// Shared-library suffix for the current platform, without the dot.
pub const LIBRARY_EXTENSION: &str = std::env::consts::DLL_EXTENSION;

/// A directory of installed extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionStore {
    dir: PathBuf,
}

impl ExtensionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store directory (`$XDG_DATA_HOME/extload/extensions`, falling
    /// back to `~/.local/share/extload/extensions`). Always absolute.
    pub fn default_dir() -> PathBuf {
        dirs_data_dir().join("extload").join("extensions")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location an extension named `name` is installed at.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{LIBRARY_EXTENSION}"))
    }

    /// Copies `source` into the store under its logical name.
    ///
    /// The logical name is the file name up to its first `.`, so
    /// `exondb.so` and `exondb.linux.so` both install as `exondb`.
    ///
    /// # Errors
    ///
    /// - [`HostError::NotFound`] if `source` is not an existing file.
    /// - [`HostError::AlreadyInstalled`] if the target exists and `force` is
    ///   not set.
    /// - [`HostError::Io`] for any filesystem failure.
    pub fn install(&self, source: &Path, force: bool) -> Result<PathBuf, HostError> {
        if !source.is_file() {
            return Err(HostError::NotFound(source.display().to_string()));
        }
        let name = logical_name(source).ok_or_else(|| {
            HostError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot derive an extension name from '{}'", source.display()),
            ))
        })?;

        let target = self.path_for(&name);
        if target.exists() && !force {
            return Err(HostError::AlreadyInstalled(target));
        }

        fs::create_dir_all(&self.dir)?;
        let mut staged = tempfile::Builder::new()
            .prefix(".install-")
            .tempfile_in(&self.dir)?;
        io::copy(&mut BufReader::new(File::open(source)?), staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|err| HostError::Io(err.error))?;

        debug!(source = %source.display(), target = %target.display(), "installed extension");
        Ok(target)
    }

    /// Returns the installed binary for `name`, if present.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name);
        path.is_file().then_some(path)
    }
}

impl Default for ExtensionStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

fn logical_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn dirs_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os("XDG_DATA_HOME"), std::env::var_os("HOME"))
}

/// Empty and relative values are ignored, as XDG requires.
fn data_dir_from(xdg_data_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    let absolute = |value: OsString| Some(PathBuf::from(value)).filter(|p| p.is_absolute());
    if let Some(xdg) = xdg_data_home.and_then(absolute) {
        return xdg;
    }
    if let Some(home) = home.and_then(absolute) {
        return home.join(".local").join("share");
    }
    std::env::temp_dir()
}
