//! Choosing which acquisition strategies to try.
//!
//! The locator runs after the direct load has reported "not found". It looks
//! only at the environment snapshot and the caller's hint, never at the
//! filesystem, and produces the ordered list of strategies for the rest of
//! the attempt.

use std::path::PathBuf;

use extload_core::{AcquisitionHint, EnvSnapshot};

/// One way of obtaining the extension binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Install from exactly this path. Failure is fatal.
    OverridePath(PathBuf),
    /// Install from this path if it exists, otherwise move on.
    ProvidedFile(PathBuf),
    /// Fetch from a caller-supplied URL.
    SourceUri(String),
    /// Fetch from the artifact store.
    Remote,
}

/// Plans the fallback chain for one bootstrap attempt.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactLocator<'a> {
    env: &'a EnvSnapshot,
    hint: &'a AcquisitionHint,
}

impl<'a> ArtifactLocator<'a> {
    pub fn new(env: &'a EnvSnapshot, hint: &'a AcquisitionHint) -> Self {
        Self { env, hint }
    }

    /// Returns the strategies to attempt, in order.
    ///
    /// An override path from the environment wins over any hint and is the
    /// only strategy tried. Otherwise the hint decides:
    ///
    /// | hint             | plan                            |
    /// |------------------|---------------------------------|
    /// | `None`           | `Remote`                        |
    /// | `OverridePath`   | `OverridePath`                  |
    /// | `ProvidedFile`   | `ProvidedFile`, then `Remote`   |
    /// | `SourceUri`      | `SourceUri`                     |
    pub fn plan(&self) -> Vec<Strategy> {
        if let Some(path) = &self.env.extension_path {
            return vec![Strategy::OverridePath(path.clone())];
        }
        match self.hint {
            AcquisitionHint::None => vec![Strategy::Remote],
            AcquisitionHint::OverridePath(path) => vec![Strategy::OverridePath(path.clone())],
            AcquisitionHint::ProvidedFile(path) => {
                vec![Strategy::ProvidedFile(path.clone()), Strategy::Remote]
            }
            AcquisitionHint::SourceUri(url) => vec![Strategy::SourceUri(url.clone())],
        }
    }
}
