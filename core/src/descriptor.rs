//! Artifact naming and acquisition hints.
//!
//! An [`ArtifactDescriptor`] is derived deterministically from the extension
//! name, version and [`PlatformTag`]. It names both the remote object and the
//! binary expected inside it.
//!
//! Remote URLs follow a single scheme:
//!
//! ```text
//! {base}/{name}/{version}/{platform_tag}/{name}-{version}-{os}-{arch}.{gz|zip}
//! ```
//!
//! # Examples
//!
//! ```
//! use extload_core::{ArchiveFormat, ArtifactDescriptor, Compatibility, PlatformTag};
//!
//! let tag = PlatformTag::resolve_from("linux", "x86_64", Compatibility::Standard).unwrap();
//! let d = ArtifactDescriptor::new(
//!     "exondb",
//!     "0.3.9",
//!     tag,
//!     ArchiveFormat::Gzip,
//!     "https://exondb-dist-prod.s3.amazonaws.com/extension",
//! );
//! assert_eq!(d.filename, "exondb-0.3.9-linux-amd64.gz");
//! assert_eq!(
//!     d.source_url,
//!     "https://exondb-dist-prod.s3.amazonaws.com/extension/exondb/0.3.9/linux_amd64/exondb-0.3.9-linux-amd64.gz"
//! );
//! assert_eq!(d.entry_name(), "exondb.so");
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::platform::PlatformTag;

/// Container format of a published artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// A single gzip-compressed binary.
    #[default]
    Gzip,
    /// A zip archive holding the binary as a named entry.
    Zip,
}

impl ArchiveFormat {
    /// File name suffix, without the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveFormat::Gzip => "gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    /// Infers the format from a URL or file name. Anything not ending in
    /// `.zip` is treated as gzip.
    pub fn infer(name: &str) -> Self {
        let trimmed = name.split(['?', '#']).next().unwrap_or(name);
        if trimmed.to_ascii_lowercase().ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::Gzip
        }
    }
}

/// Everything needed to fetch and name one extension build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub version: String,
    pub platform: PlatformTag,
    pub format: ArchiveFormat,
    /// Remote object name, `{name}-{version}-{os}-{arch}.{suffix}`.
    pub filename: String,
    pub source_url: String,
    /// Expected lowercase hex SHA-256 of the artifact, when known.
    pub sha256: Option<String>,
}

impl ArtifactDescriptor {
    /// Builds the descriptor for the canonical artifact store layout rooted
    /// at `base_url`. A trailing `/` on the base is ignored.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        platform: PlatformTag,
        format: ArchiveFormat,
        base_url: &str,
    ) -> Self {
        let name = name.into();
        let version = version.into();
        let filename = format!(
            "{name}-{version}-{}-{}.{}",
            platform.os.tag_name(),
            platform.arch.tag_name(),
            format.suffix()
        );
        let source_url = format!(
            "{}/{name}/{version}/{platform}/{filename}",
            base_url.trim_end_matches('/')
        );
        Self {
            name,
            version,
            platform,
            format,
            filename,
            source_url,
            sha256: None,
        }
    }

    /// Builds a descriptor for a caller-supplied URL. The format is inferred
    /// from the URL and the last path segment becomes the file name.
    pub fn from_source_uri(
        name: impl Into<String>,
        version: impl Into<String>,
        platform: PlatformTag,
        url: &str,
    ) -> Self {
        let format = ArchiveFormat::infer(url);
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let filename = path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("artifact.{}", format.suffix()));
        Self {
            name: name.into(),
            version: version.into(),
            platform,
            format,
            filename,
            source_url: url.to_string(),
            sha256: None,
        }
    }

    /// Sets the digest the downloaded artifact must match.
    pub fn with_sha256(mut self, digest: Option<String>) -> Self {
        self.sha256 = digest.map(|d| d.to_ascii_lowercase());
        self
    }

    /// Name of the extension binary inside the artifact, e.g. `exondb.so`.
    pub fn entry_name(&self) -> String {
        format!("{}.{}", self.name, self.platform.os.library_extension())
    }
}

/// Caller-supplied hint about where the extension binary can be found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AcquisitionHint {
    /// No hint; fall back to the artifact store.
    #[default]
    None,
    /// Install from exactly this file. Failure is fatal.
    OverridePath(PathBuf),
    /// Install from this file when it exists. Advisory only.
    ProvidedFile(PathBuf),
    /// Fetch from this URL instead of the derived artifact store URL.
    SourceUri(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Compatibility;

    fn osx_arm() -> PlatformTag {
        PlatformTag::resolve_from("darwin", "arm64", Compatibility::Standard).unwrap()
    }

    #[test]
    fn test_zip_descriptor() {
        let d = ArtifactDescriptor::new("wtt01", "1.2.0", osx_arm(), ArchiveFormat::Zip, "http://h/p/");
        assert_eq!(d.filename, "wtt01-1.2.0-osx-arm64.zip");
        assert_eq!(d.source_url, "http://h/p/wtt01/1.2.0/osx_arm64/wtt01-1.2.0-osx-arm64.zip");
        assert_eq!(d.entry_name(), "wtt01.dylib");
    }

    #[test]
    fn test_variant_appears_in_url_not_filename() {
        let tag = PlatformTag::resolve_from("linux", "x86_64", Compatibility::LegacyAbi).unwrap();
        let d = ArtifactDescriptor::new("exondb", "0.1.0", tag, ArchiveFormat::Gzip, "https://x");
        assert_eq!(d.filename, "exondb-0.1.0-linux-amd64.gz");
        assert!(d.source_url.contains("/linux_amd64_gcc4/"));
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let a = ArtifactDescriptor::new("n", "1", osx_arm(), ArchiveFormat::Gzip, "https://x");
        let b = ArtifactDescriptor::new("n", "1", osx_arm(), ArchiveFormat::Gzip, "https://x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_source_uri() {
        let d = ArtifactDescriptor::from_source_uri(
            "exondb",
            "0.1.0",
            osx_arm(),
            "https://mirror.example.com/builds/exondb.zip?sig=abc",
        );
        assert_eq!(d.format, ArchiveFormat::Zip);
        assert_eq!(d.filename, "exondb.zip");
        assert_eq!(d.entry_name(), "exondb.dylib");

        let gz = ArtifactDescriptor::from_source_uri("e", "1", osx_arm(), "https://m/e.so.gz");
        assert_eq!(gz.format, ArchiveFormat::Gzip);
        assert_eq!(gz.filename, "e.so.gz");
    }

    #[test]
    fn test_from_source_uri_without_file_segment() {
        let d = ArtifactDescriptor::from_source_uri("e", "1", osx_arm(), "https://m/");
        assert_eq!(d.filename, "artifact.gz");
    }
}
