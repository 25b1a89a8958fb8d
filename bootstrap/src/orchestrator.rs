//! The bootstrap state machine.
//!
//! ```text
//! (license check) → Init → TryDirectLoad ─┬─ found ────────────────────→ Loaded
//!                                          └─ not found → plan:
//!                                               TryOverridePath ───────→ Loaded | Failed
//!                                               TryProvidedFile ─ missing → next
//!                                               TrySourceUri ──────────→ Loaded | Failed
//!                                               TryRemote ─────────────→ Loaded | Failed
//! ```
//!
//! The license check runs before `Init`; when it fails nothing touches the
//! session, the filesystem or the network. The deadline is checked before
//! every state and handed to the fetcher, the unpacker and the installer,
//! which abandon their work when it expires. Scratch directories belong to the fetched artifact
//! and are removed when the fetching state returns, whatever the outcome.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::vec;

use extload_core::{
    AcquisitionHint, ArtifactDescriptor, BootstrapConfig, Deadline, EnvSnapshot, ExtensionHost,
    HostError, PlatformTag,
};
use extload_fetch::{DownloadCause, Fetcher, UnpackReason, unpack};
use tracing::{debug, info, warn};

use crate::error::{BootstrapError, Result, Stage};
use crate::installer::install_and_load;
use crate::locator::{ArtifactLocator, Strategy};

/// Subdirectory of the scratch directory that unpacked binaries go into.
const UNPACK_DIR: &str = "unpacked";

/// Outcome of a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    /// Logical name the extension was loaded under.
    pub name: String,
    /// The strategy that produced the loaded extension.
    pub via: Stage,
    /// Where the binary was installed; `None` when it was already present.
    pub installed_path: Option<PathBuf>,
}

#[derive(Debug)]
enum State {
    Init,
    TryDirectLoad,
    TryOverridePath(PathBuf),
    TryProvidedFile(PathBuf),
    TrySourceUri(String),
    TryRemote,
    Loaded(Loaded),
    Failed(BootstrapError),
}

impl State {
    fn stage(&self) -> Option<Stage> {
        match self {
            State::Init | State::TryDirectLoad => Some(Stage::DirectLoad),
            State::TryOverridePath(_) => Some(Stage::OverridePath),
            State::TryProvidedFile(_) => Some(Stage::ProvidedFile),
            State::TrySourceUri(_) => Some(Stage::SourceUri),
            State::TryRemote => Some(Stage::Remote),
            State::Loaded(_) | State::Failed(_) => None,
        }
    }

    fn from_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::OverridePath(path) => State::TryOverridePath(path),
            Strategy::ProvidedFile(path) => State::TryProvidedFile(path),
            Strategy::SourceUri(url) => State::TrySourceUri(url),
            Strategy::Remote => State::TryRemote,
        }
    }
}

/// Ensures one extension is installed and loaded into a session.
///
/// Holds only borrowed configuration and the injected fetcher; it keeps no
/// state between [`run`](Bootstrap::run) calls, so one value can bootstrap
/// any number of sessions.
///
/// # Examples
///
/// ```no_run
/// use extload_bootstrap::{Bootstrap, BootstrapError};
/// use extload_core::{AcquisitionHint, BootstrapConfig, EnvSnapshot, ExtensionHost};
/// use extload_fetch::HttpFetcher;
///
/// fn prepare<H: ExtensionHost>(session: &mut H) -> Result<(), BootstrapError> {
///     let config = BootstrapConfig::new("exondb", "0.3.9");
///     let env = EnvSnapshot::capture(config.env_keys());
///     let fetcher = HttpFetcher::new().expect("TLS backend");
///
///     let loaded = Bootstrap::new(&config, &env, &fetcher).run(session, &AcquisitionHint::None)?;
///     println!("loaded via {}", loaded.via);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Bootstrap<'a, F> {
    config: &'a BootstrapConfig,
    env: &'a EnvSnapshot,
    fetcher: F,
    platform: Option<PlatformTag>,
    timeout: Option<Duration>,
}

impl<'a, F: Fetcher> Bootstrap<'a, F> {
    pub fn new(config: &'a BootstrapConfig, env: &'a EnvSnapshot, fetcher: F) -> Self {
        Self {
            config,
            env,
            fetcher,
            platform: None,
            timeout: config.timeout(),
        }
    }

    /// Uses `platform` instead of resolving the host platform.
    pub fn with_platform(mut self, platform: PlatformTag) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Overrides the configured overall time budget.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the fallback chain against `host`.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::Configuration`] when the license marker is missing
    ///   or the configuration is invalid. No other work happens in that case.
    /// - [`BootstrapError::TimedOut`] when the time budget runs out.
    /// - Otherwise the error of the last strategy that was attempted.
    pub fn run<H: ExtensionHost>(&self, host: &mut H, hint: &AcquisitionHint) -> Result<Loaded> {
        if let Err(err) = self.env.require_license() {
            warn!(var = %self.env.keys.license, "license marker missing; not bootstrapping");
            return Err(err.into());
        }
        self.config.validate()?;

        let deadline = Deadline::from_timeout(self.timeout);
        let mut plan: vec::IntoIter<Strategy> = Vec::new().into_iter();
        let mut state = State::Init;

        loop {
            if let Some(stage) = state.stage() {
                if deadline.is_expired() {
                    state = State::Failed(BootstrapError::timed_out(stage, &deadline));
                }
            }
            debug!(?state, "bootstrap state");

            state = match state {
                State::Init => State::TryDirectLoad,
                State::TryDirectLoad => match host.load_extension(&self.config.name) {
                    Ok(()) => State::Loaded(self.loaded(Stage::DirectLoad, None)),
                    Err(err) if err.is_not_found() => {
                        debug!(name = %self.config.name, "extension not installed yet");
                        plan = ArtifactLocator::new(self.env, hint).plan().into_iter();
                        next_state(&mut plan)
                    }
                    Err(source) => State::Failed(BootstrapError::Load {
                        stage: Stage::DirectLoad,
                        name: self.config.name.clone(),
                        source,
                    }),
                },
                State::TryOverridePath(path) => {
                    let outcome = self.install_local(host, &path, Stage::OverridePath, &deadline);
                    self.settle(Stage::OverridePath, outcome)
                }
                State::TryProvidedFile(path) => {
                    if path.is_file() {
                        let outcome = self.install_local(host, &path, Stage::ProvidedFile, &deadline);
                        self.settle(Stage::ProvidedFile, outcome)
                    } else {
                        info!(path = %path.display(), "provided extension file not found; falling back");
                        next_state(&mut plan)
                    }
                }
                State::TrySourceUri(url) => {
                    let outcome = self.resolve_platform(Stage::SourceUri).and_then(|platform| {
                        let descriptor = ArtifactDescriptor::from_source_uri(
                            &self.config.name,
                            &self.config.version,
                            platform,
                            &url,
                        );
                        self.fetch_and_install(host, &descriptor, Stage::SourceUri, &deadline)
                    });
                    self.settle(Stage::SourceUri, outcome)
                }
                State::TryRemote => {
                    let outcome = self.resolve_platform(Stage::Remote).and_then(|platform| {
                        let descriptor = ArtifactDescriptor::new(
                            &self.config.name,
                            &self.config.version,
                            platform,
                            self.config.format,
                            &self.config.base_url(self.env),
                        )
                        .with_sha256(self.config.sha256.clone());
                        self.fetch_and_install(host, &descriptor, Stage::Remote, &deadline)
                    });
                    self.settle(Stage::Remote, outcome)
                }
                State::Loaded(loaded) => {
                    info!(name = %loaded.name, via = %loaded.via, "bootstrap complete");
                    return Ok(loaded);
                }
                State::Failed(err) => {
                    warn!(stage = %err.stage(), error = %err, "bootstrap failed");
                    return Err(err);
                }
            };
        }
    }

    fn loaded(&self, via: Stage, installed_path: Option<PathBuf>) -> Loaded {
        Loaded {
            name: self.config.name.clone(),
            via,
            installed_path,
        }
    }

    fn settle(&self, stage: Stage, outcome: Result<PathBuf>) -> State {
        match outcome {
            Ok(installed) => State::Loaded(self.loaded(stage, Some(installed))),
            Err(err) => State::Failed(err),
        }
    }

    fn resolve_platform(&self, stage: Stage) -> Result<PlatformTag> {
        match &self.platform {
            Some(platform) => Ok(platform.clone()),
            None => PlatformTag::resolve(self.config.compatibility)
                .map_err(|source| BootstrapError::UnsupportedPlatform { stage, source }),
        }
    }

    /// Installs from a local file, which must exist.
    fn install_local<H: ExtensionHost>(
        &self,
        host: &mut H,
        path: &Path,
        stage: Stage,
        deadline: &Deadline,
    ) -> Result<PathBuf> {
        let install_error = |source| BootstrapError::Install {
            stage,
            path: path.to_path_buf(),
            source,
        };
        if !path.is_file() {
            return Err(install_error(HostError::NotFound(path.display().to_string())));
        }
        let absolute = std::path::absolute(path).map_err(|err| install_error(HostError::Io(err)))?;
        install_and_load(host, &absolute, &self.config.name, stage, deadline)
    }

    fn fetch_and_install<H: ExtensionHost>(
        &self,
        host: &mut H,
        descriptor: &ArtifactDescriptor,
        stage: Stage,
        deadline: &Deadline,
    ) -> Result<PathBuf> {
        debug!(%stage, url = %descriptor.source_url, platform = %descriptor.platform, "fetching");
        let artifact = self.fetcher.fetch(descriptor, deadline).map_err(|source| {
            if matches!(source.cause, DownloadCause::TimedOut) {
                BootstrapError::timed_out(stage, deadline)
            } else {
                BootstrapError::Download { stage, source }
            }
        })?;

        // The artifact may already carry the entry's file name.
        let binary = unpack(
            artifact.path(),
            descriptor.format,
            &descriptor.entry_name(),
            &artifact.scratch_dir().join(UNPACK_DIR),
            deadline,
        )
        .map_err(|source| {
            if matches!(source.reason, UnpackReason::TimedOut) {
                BootstrapError::timed_out(stage, deadline)
            } else {
                BootstrapError::Unpack { stage, source }
            }
        })?;
        debug!(%stage, binary = %binary.display(), "artifact unpacked");

        install_and_load(host, &binary, &self.config.name, stage, deadline)
    }
}

/// Moves to the next planned strategy. The artifact store is the last
/// resort once the plan is used up.
fn next_state(plan: &mut vec::IntoIter<Strategy>) -> State {
    State::from_strategy(plan.next().unwrap_or(Strategy::Remote))
}
