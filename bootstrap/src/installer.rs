//! Install-then-load against an engine session.

use std::path::{Path, PathBuf};

use extload_core::{Deadline, ExtensionHost};
use tracing::{debug, info};

use crate::error::{BootstrapError, Result, Stage};

/// Installs `binary` into the session's extension store, replacing any
/// previous copy, then loads it as `name`.
///
/// Install and load are separate failure domains: an install failure is
/// returned as [`BootstrapError::Install`] without attempting the load, and a
/// load failure after a successful install is [`BootstrapError::Load`].
///
/// The deadline is checked before the install and again before the load;
/// expiry at either point is [`BootstrapError::TimedOut`].
///
/// Returns the installed location.
pub fn install_and_load<H: ExtensionHost>(
    host: &mut H,
    binary: &Path,
    name: &str,
    stage: Stage,
    deadline: &Deadline,
) -> Result<PathBuf> {
    if deadline.is_expired() {
        return Err(BootstrapError::timed_out(stage, deadline));
    }
    debug!(%stage, binary = %binary.display(), "installing extension");
    let installed = host
        .install_extension(binary, true)
        .map_err(|source| BootstrapError::Install {
            stage,
            path: binary.to_path_buf(),
            source,
        })?;

    if deadline.is_expired() {
        return Err(BootstrapError::timed_out(stage, deadline));
    }
    host.load_extension(name)
        .map_err(|source| BootstrapError::Load {
            stage,
            name: name.to_string(),
            source,
        })?;

    info!(%stage, name, installed = %installed.display(), "extension loaded");
    Ok(installed)
}
