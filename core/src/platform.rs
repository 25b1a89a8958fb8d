//! Host platform resolution.
//!
//! Maps the host operating system and CPU architecture onto the canonical
//! distribution tag used to select a prebuilt extension artifact
//! (`linux_amd64`, `osx_arm64`, `windows_amd64`, ...).
//!
//! Resolution is a closed table lookup: any (OS, arch) pair that is not in
//! the table fails with [`PlatformError::Unsupported`] instead of falling
//! back to a default tag.
//!
//! # Examples
//!
//! ```
//! use extload_core::{Arch, Compatibility, Os, PlatformTag};
//!
//! let tag = PlatformTag::resolve_from("Linux", "x86_64", Compatibility::Standard).unwrap();
//! assert_eq!(tag.os, Os::Linux);
//! assert_eq!(tag.arch, Arch::Amd64);
//! assert_eq!(tag.to_string(), "linux_amd64");
//!
//! let legacy = PlatformTag::resolve_from("linux", "amd64", Compatibility::LegacyAbi).unwrap();
//! assert_eq!(legacy.to_string(), "linux_amd64_gcc4");
//!
//! assert!(PlatformTag::resolve_from("freebsd", "x86_64", Compatibility::Standard).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Variant suffix of the legacy-ABI Linux build.
pub const LEGACY_ABI_VARIANT: &str = "gcc4";

/// Operating system family of a distribution tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    /// Name used in tags and artifact file names.
    pub fn tag_name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "osx",
            Os::Windows => "windows",
        }
    }

    /// Shared-library file extension for binaries built for this OS.
    pub fn library_extension(self) -> &'static str {
        match self {
            Os::Linux => "so",
            Os::Darwin => "dylib",
            Os::Windows => "dll",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "linux" => Some(Os::Linux),
            "darwin" | "macos" | "osx" => Some(Os::Darwin),
            "windows" => Some(Os::Windows),
            _ => None,
        }
    }
}

/// CPU architecture of a distribution tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Name used in tags and artifact file names.
    pub fn tag_name(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Some(Arch::Amd64),
            "aarch64" | "arm64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

/// ABI compatibility requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    /// The default build for the platform.
    #[default]
    Standard,
    /// The legacy-ABI build where one exists (`linux_amd64_gcc4`).
    LegacyAbi,
}

/// Canonical distribution tag for one (OS, arch, variant) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformTag {
    pub os: Os,
    pub arch: Arch,
    pub variant: Option<String>,
}

/// Every (OS, arch) pair an artifact is published for.
const SUPPORTED: &[(Os, Arch)] = &[
    (Os::Linux, Arch::Amd64),
    (Os::Linux, Arch::Arm64),
    (Os::Darwin, Arch::Amd64),
    (Os::Darwin, Arch::Arm64),
    (Os::Windows, Arch::Amd64),
];

impl PlatformTag {
    /// Resolves the tag for the host this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`] when the host is not in the
    /// supported table.
    pub fn resolve(compat: Compatibility) -> Result<Self, PlatformError> {
        Self::resolve_from(std::env::consts::OS, std::env::consts::ARCH, compat)
    }

    /// Resolves the tag for an explicit OS name and architecture string.
    ///
    /// Both strings are matched case-insensitively. Common aliases are
    /// accepted (`macos`/`darwin`, `x86_64`/`amd64`, `aarch64`/`arm64`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`] carrying the raw strings when
    /// either part is unknown or the pair is not published.
    pub fn resolve_from(os: &str, arch: &str, compat: Compatibility) -> Result<Self, PlatformError> {
        let unsupported = || PlatformError::Unsupported {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let parsed_os = Os::parse(os).ok_or_else(unsupported)?;
        let parsed_arch = Arch::parse(arch).ok_or_else(unsupported)?;
        if !SUPPORTED.contains(&(parsed_os, parsed_arch)) {
            return Err(unsupported());
        }

        let variant = match (compat, parsed_os, parsed_arch) {
            (Compatibility::LegacyAbi, Os::Linux, Arch::Amd64) => {
                Some(LEGACY_ABI_VARIANT.to_string())
            }
            (Compatibility::LegacyAbi, _, _) => {
                tracing::debug!(os, arch, "no legacy ABI build for platform; using standard tag");
                None
            }
            (Compatibility::Standard, _, _) => None,
        };

        Ok(Self {
            os: parsed_os,
            arch: parsed_arch,
            variant,
        })
    }

    /// Returns the supported (OS, arch) table.
    pub fn supported() -> &'static [(Os, Arch)] {
        SUPPORTED
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os.tag_name(), self.arch.tag_name())?;
        if let Some(variant) = &self.variant {
            write!(f, "_{variant}")?;
        }
        Ok(())
    }
}
