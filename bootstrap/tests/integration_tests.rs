//! Integration tests for the bootstrap fallback chain using an in-memory
//! engine and a fetcher that serves fixtures from disk.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use extload_bootstrap::{Bootstrap, BootstrapError, Stage};
use extload_core::{
    AcquisitionHint, ArchiveFormat, ArtifactDescriptor, BootstrapConfig, Compatibility, Deadline,
    EnvKeys, EnvSnapshot, ExtensionHost, HostError, PlatformTag,
};
use extload_fetch::{DownloadCause, DownloadError, FetchedArtifact, Fetcher, scratch_dir};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

const BINARY: &[u8] = b"\x7fELF exondb build";

/// An engine that keeps installed binaries in memory and refuses to load
/// anything starting with `BAD`.
#[derive(Default)]
struct MemoryHost {
    store: BTreeMap<String, Vec<u8>>,
    loaded: BTreeSet<String>,
    calls: Vec<String>,
}

impl ExtensionHost for MemoryHost {
    type Output = String;

    fn install_extension(&mut self, path: &Path, force: bool) -> Result<PathBuf, HostError> {
        self.calls.push(format!("install {}", path.display()));
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let name = file_name.split('.').next().unwrap_or_default().to_string();
        let target = PathBuf::from("/store").join(&file_name);
        if !force && self.store.contains_key(&name) {
            return Err(HostError::AlreadyInstalled(target));
        }
        self.store.insert(name, bytes);
        Ok(target)
    }

    fn load_extension(&mut self, name: &str) -> Result<(), HostError> {
        self.calls.push(format!("load {name}"));
        if self.loaded.contains(name) {
            return Ok(());
        }
        match self.store.get(name) {
            None => Err(HostError::NotFound(name.to_string())),
            Some(bytes) if bytes.starts_with(b"BAD") => {
                Err(HostError::Engine("invalid ELF header".into()))
            }
            Some(_) => {
                self.loaded.insert(name.to_string());
                Ok(())
            }
        }
    }

    fn execute(&mut self, sql: &str) -> Result<String, HostError> {
        Ok(sql.to_string())
    }
}

/// Serves fixed bytes for every request and records what was asked for.
struct FixtureFetcher {
    body: Option<Vec<u8>>,
    requests: RefCell<Vec<ArtifactDescriptor>>,
}

impl FixtureFetcher {
    fn serving(body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn offline() -> Self {
        Self {
            body: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Fetcher for FixtureFetcher {
    fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        _deadline: &Deadline,
    ) -> Result<FetchedArtifact, DownloadError> {
        self.requests.borrow_mut().push(descriptor.clone());
        let fail = |cause| DownloadError::new(&descriptor.source_url, cause);
        let Some(body) = &self.body else {
            return Err(fail(DownloadCause::Status(503)));
        };
        let scratch = scratch_dir().map_err(|e| fail(DownloadCause::Io(e)))?;
        let path = scratch.path().join(&descriptor.filename);
        std::fs::write(&path, body).map_err(|e| fail(DownloadCause::Io(e)))?;
        Ok(FetchedArtifact::new(scratch, path, "0".repeat(64)))
    }
}

/// Hands out its fixture only after `delay` has passed.
struct SlowFetcher {
    inner: FixtureFetcher,
    delay: Duration,
}

impl Fetcher for SlowFetcher {
    fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        deadline: &Deadline,
    ) -> Result<FetchedArtifact, DownloadError> {
        thread::sleep(self.delay);
        self.inner.fetch(descriptor, deadline)
    }
}

fn config() -> BootstrapConfig {
    let mut config = BootstrapConfig::new("exondb", "0.3.9");
    config.base_url = Some("https://artifacts.test/extension".to_string());
    config
}

fn licensed() -> EnvSnapshot {
    EnvSnapshot::empty(EnvKeys::for_extension("exondb")).with_license("test-license")
}

fn linux() -> PlatformTag {
    PlatformTag::resolve_from("linux", "x86_64", Compatibility::Standard).unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Pseudo-random bytes that deflate cannot shrink.
fn incompressible(len: usize) -> Vec<u8> {
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn extension_file(dir: &TempDir, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join("exondb.so");
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn missing_license_does_nothing() {
    let config = config();
    let env = EnvSnapshot::empty(EnvKeys::for_extension("exondb")).with_extension_path("/nope.so");
    let fetcher = FixtureFetcher::serving(gzip(BINARY));
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Configuration(_)));
    assert!(err.to_string().contains("EXONDB_LICENSE"));
    assert!(host.calls.is_empty());
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn override_path_loads_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let binary = extension_file(&dir, BINARY);
    let config = config();
    let env = licensed().with_extension_path(&binary);
    let fetcher = FixtureFetcher::offline();
    let mut host = MemoryHost::default();

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap();

    assert_eq!(loaded.via, Stage::OverridePath);
    assert_eq!(loaded.installed_path, Some(PathBuf::from("/store/exondb.so")));
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(host.store["exondb"], BINARY);
}

#[test]
fn missing_override_path_is_fatal() {
    let config = config();
    let env = licensed().with_extension_path("/definitely/not/here/exondb.so");
    let fetcher = FixtureFetcher::serving(gzip(BINARY));
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Install {
            stage: Stage::OverridePath,
            source: HostError::NotFound(_),
            ..
        }
    ));
    assert!(err.to_string().contains("/definitely/not/here/exondb.so"));
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(host.calls, vec!["load exondb".to_string()]);
}

#[test]
fn missing_provided_file_falls_back_to_remote() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::serving(gzip(BINARY));
    let mut host = MemoryHost::default();

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::ProvidedFile("/no/such/exondb.so".into()))
        .unwrap();

    assert_eq!(loaded.via, Stage::Remote);
    assert_eq!(host.store["exondb"], BINARY);

    let requests = fetcher.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].source_url,
        "https://artifacts.test/extension/exondb/0.3.9/linux_amd64/exondb-0.3.9-linux-amd64.gz"
    );
}

#[test]
fn existing_provided_file_is_installed() {
    let dir = tempfile::tempdir().unwrap();
    let binary = extension_file(&dir, BINARY);
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::offline();
    let mut host = MemoryHost::default();

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::ProvidedFile(binary))
        .unwrap();

    assert_eq!(loaded.via, Stage::ProvidedFile);
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn remote_zip_artifact_extracts_named_entry() {
    let mut config = config();
    config.format = ArchiveFormat::Zip;
    let env = licensed();
    let body = zip_with(&[("README.txt", b"docs"), ("exondb.so", BINARY)]);
    let fetcher = FixtureFetcher::serving(body);
    let mut host = MemoryHost::default();

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap();

    assert_eq!(loaded.via, Stage::Remote);
    assert_eq!(host.store["exondb"], BINARY);
    assert!(fetcher.requests.borrow()[0].filename.ends_with(".zip"));
}

#[test]
fn zip_without_expected_entry_is_unpack_error() {
    let mut config = config();
    config.format = ArchiveFormat::Zip;
    let env = licensed();
    let fetcher = FixtureFetcher::serving(zip_with(&[("other.so", BINARY)]));
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Unpack { stage: Stage::Remote, .. }));
    assert!(host.store.is_empty());
}

#[test]
fn source_uri_uses_caller_url_and_inferred_format() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::serving(zip_with(&[("exondb.so", BINARY)]));
    let mut host = MemoryHost::default();
    let url = "https://mirror.test/builds/exondb-nightly.zip";

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::SourceUri(url.to_string()))
        .unwrap();

    assert_eq!(loaded.via, Stage::SourceUri);
    let requests = fetcher.requests.borrow();
    assert_eq!(requests[0].source_url, url);
    assert_eq!(requests[0].format, ArchiveFormat::Zip);
}

#[test]
fn source_uri_named_like_the_entry_unpacks_intact() {
    let config = config();
    let env = licensed();
    let mut binary = BINARY.to_vec();
    binary.extend(incompressible(500_000));
    let fetcher = FixtureFetcher::serving(gzip(&binary));
    let mut host = MemoryHost::default();
    let url = "https://mirror.test/builds/exondb.so";

    let loaded = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::SourceUri(url.to_string()))
        .unwrap();

    assert_eq!(loaded.via, Stage::SourceUri);
    assert_eq!(fetcher.requests.borrow()[0].filename, "exondb.so");
    assert_eq!(host.store["exondb"], binary);
}

#[test]
fn budget_spent_during_download_installs_nothing() {
    let config = config();
    let env = licensed();
    let fetcher = SlowFetcher {
        inner: FixtureFetcher::serving(gzip(BINARY)),
        delay: Duration::from_millis(300),
    };
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .with_timeout(Some(Duration::from_millis(100)))
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::TimedOut { stage: Stage::Remote, .. }));
    assert_eq!(host.calls, vec!["load exondb".to_string()]);
    assert!(host.store.is_empty());
}

#[test]
fn download_failure_names_stage_and_url() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::offline();
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Remote);
    assert!(matches!(err, BootstrapError::Download { .. }));
    assert!(err.to_string().contains("https://artifacts.test/extension/exondb/0.3.9"));
    assert!(err.remediation().contains("connectivity"));
}

#[test]
fn engine_rejection_after_install_is_load_error() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::serving(gzip(b"BAD binary for another engine"));
    let mut host = MemoryHost::default();

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Load { stage: Stage::Remote, .. }));
    assert!(host.store.contains_key("exondb"));
}

#[test]
fn second_run_on_same_session_is_direct_load() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::serving(gzip(BINARY));
    let mut host = MemoryHost::default();
    let bootstrap = Bootstrap::new(&config, &env, &fetcher).with_platform(linux());

    let first = bootstrap.run(&mut host, &AcquisitionHint::None).unwrap();
    let second = bootstrap.run(&mut host, &AcquisitionHint::None).unwrap();

    assert_eq!(first.via, Stage::Remote);
    assert_eq!(second.via, Stage::DirectLoad);
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn repeated_install_on_fresh_sessions_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let binary = extension_file(&dir, BINARY);
    let config = config();
    let env = licensed().with_extension_path(&binary);
    let fetcher = FixtureFetcher::offline();
    let mut host = MemoryHost::default();
    let bootstrap = Bootstrap::new(&config, &env, &fetcher).with_platform(linux());

    for _ in 0..2 {
        // Each pass starts from an empty engine so the install runs again.
        host.loaded.clear();
        host.store.clear();
        let loaded = bootstrap.run(&mut host, &AcquisitionHint::None).unwrap();
        assert_eq!(loaded.via, Stage::OverridePath);
    }
}

#[test]
fn direct_load_engine_error_is_fatal() {
    let config = config();
    let env = licensed();
    let fetcher = FixtureFetcher::serving(gzip(BINARY));
    let mut host = MemoryHost::default();
    host.store.insert("exondb".to_string(), b"BAD stale build".to_vec());

    let err = Bootstrap::new(&config, &env, &fetcher)
        .with_platform(linux())
        .run(&mut host, &AcquisitionHint::None)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Load { stage: Stage::DirectLoad, .. }));
    assert_eq!(fetcher.calls(), 0);
}
