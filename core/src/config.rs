//! Bootstrap configuration from the environment and YAML files.
//!
//! Environment variables are derived from the extension name: for an
//! extension called `exondb` the bootstrap reads
//!
//! - `EXONDB_LICENSE`: required credential marker,
//! - `EXONDB_EXTENSION_PATH`: optional override path,
//! - `EXONDB_ENVIRONMENT`: artifact store tier (default `prod`),
//! - `EXONDB_BASE_URL`: optional explicit artifact store base URL.
//!
//! The environment is read once into an [`EnvSnapshot`]; everything
//! downstream works from that snapshot.
//!
//! # Example YAML
//!
//! ```yaml
//! name: exondb
//! version: 0.3.9
//! format: gzip
//! compatibility: legacy_abi
//! base_url: https://dbe.example.com
//! timeout_secs: 120
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::ArchiveFormat;
use crate::error::ConfigError;
use crate::platform::Compatibility;

/// Artifact store tier used when none is configured.
pub const DEFAULT_TIER: &str = "prod";

/// Names of the environment variables consulted for one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvKeys {
    pub license: String,
    pub extension_path: String,
    pub environment: String,
    pub base_url: String,
}

impl EnvKeys {
    /// Derives the variable names from an extension name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use extload_core::EnvKeys;
    /// let keys = EnvKeys::for_extension("exon-db");
    /// assert_eq!(keys.license, "EXON_DB_LICENSE");
    /// assert_eq!(keys.extension_path, "EXON_DB_EXTENSION_PATH");
    /// ```
    pub fn for_extension(name: &str) -> Self {
        let prefix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        Self {
            license: format!("{prefix}_LICENSE"),
            extension_path: format!("{prefix}_EXTENSION_PATH"),
            environment: format!("{prefix}_ENVIRONMENT"),
            base_url: format!("{prefix}_BASE_URL"),
        }
    }
}

/// Values of the bootstrap environment variables at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub keys: EnvKeys,
    pub license: Option<String>,
    pub extension_path: Option<PathBuf>,
    pub environment: Option<String>,
    pub base_url: Option<String>,
}

impl EnvSnapshot {
    /// Reads the process environment.
    pub fn capture(keys: EnvKeys) -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            license: non_empty(&keys.license),
            extension_path: non_empty(&keys.extension_path).map(PathBuf::from),
            environment: non_empty(&keys.environment),
            base_url: non_empty(&keys.base_url),
            keys,
        }
    }

    /// A snapshot with nothing set.
    pub fn empty(keys: EnvKeys) -> Self {
        Self {
            keys,
            license: None,
            extension_path: None,
            environment: None,
            base_url: None,
        }
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn with_extension_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension_path = Some(path.into());
        self
    }

    pub fn with_environment(mut self, tier: impl Into<String>) -> Self {
        self.environment = Some(tier.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Checks the credential marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingLicense`] naming the variable when it is
    /// unset or blank.
    pub fn require_license(&self) -> Result<&str, ConfigError> {
        match self.license.as_deref() {
            Some(license) if !license.trim().is_empty() => Ok(license),
            _ => Err(ConfigError::MissingLicense {
                var: self.keys.license.clone(),
            }),
        }
    }

    /// Artifact store tier, defaulting to [`DEFAULT_TIER`].
    pub fn tier(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_TIER)
    }
}

/// Settings for bootstrapping one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Logical extension name, also the name it is loaded under.
    pub name: String,
    /// Extension version to fetch from the artifact store.
    pub version: String,
    /// Container format of artifact store objects.
    #[serde(default)]
    pub format: ArchiveFormat,
    /// Request the legacy-ABI build where one exists.
    #[serde(default)]
    pub compatibility: Compatibility,
    /// Explicit artifact store base URL; derived from the tier when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Overall time budget for one bootstrap attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Expected lowercase hex SHA-256 of the downloaded artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl BootstrapConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            format: ArchiveFormat::default(),
            compatibility: Compatibility::default(),
            base_url: None,
            timeout_secs: None,
            sha256: None,
        }
    }

    /// Loads and validates a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if parsing fails, or
    /// [`ConfigError::InvalidValue`] if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written, or
    /// [`ConfigError::Yaml`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Checks field constraints.
    ///
    /// The name may contain only ASCII alphanumerics and underscores since it
    /// becomes part of file names and the engine's entry point symbol.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidValue {
                field: "name",
                reason: format!(
                    "'{}' must be non-empty and contain only alphanumerics and underscores",
                    self.name
                ),
            });
        }
        if self.version.trim().is_empty() || self.version.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "version",
                reason: format!("'{}' is not a usable version", self.version),
            });
        }
        if let Some(digest) = &self.sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidValue {
                    field: "sha256",
                    reason: "expected 64 hex characters".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Overall time budget, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Artifact store base URL.
    ///
    /// Precedence: the environment's base URL, then the configured one, then
    /// the tier bucket `https://{name}-dist-{tier}.s3.amazonaws.com/extension`.
    pub fn base_url(&self, env: &EnvSnapshot) -> String {
        if let Some(url) = env.base_url.as_ref().or(self.base_url.as_ref()) {
            return url.trim_end_matches('/').to_string();
        }
        let bucket = self.name.replace('_', "-").to_ascii_lowercase();
        format!("https://{bucket}-dist-{}.s3.amazonaws.com/extension", env.tier())
    }

    /// Environment variable names for this extension.
    pub fn env_keys(&self) -> EnvKeys {
        EnvKeys::for_extension(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> EnvSnapshot {
        EnvSnapshot::empty(EnvKeys::for_extension("exondb"))
    }

    #[test]
    fn test_env_keys() {
        let keys = EnvKeys::for_extension("exondb");
        assert_eq!(keys.license, "EXONDB_LICENSE");
        assert_eq!(keys.extension_path, "EXONDB_EXTENSION_PATH");
        assert_eq!(keys.environment, "EXONDB_ENVIRONMENT");
        assert_eq!(keys.base_url, "EXONDB_BASE_URL");
    }

    #[test]
    fn test_require_license() {
        let err = snapshot().require_license().unwrap_err();
        assert!(matches!(err, ConfigError::MissingLicense { ref var } if var == "EXONDB_LICENSE"));
        assert!(err.to_string().contains("EXONDB_LICENSE"));

        assert!(snapshot().with_license("   ").require_license().is_err());
        assert_eq!(snapshot().with_license("abc").require_license().unwrap(), "abc");
    }

    #[test]
    fn test_base_url_precedence() {
        let mut config = BootstrapConfig::new("exondb", "0.1.0");
        assert_eq!(
            config.base_url(&snapshot()),
            "https://exondb-dist-prod.s3.amazonaws.com/extension"
        );
        assert_eq!(
            config.base_url(&snapshot().with_environment("dev")),
            "https://exondb-dist-dev.s3.amazonaws.com/extension"
        );

        config.base_url = Some("https://dbe.example.com/".into());
        assert_eq!(config.base_url(&snapshot()), "https://dbe.example.com");
        assert_eq!(
            config.base_url(&snapshot().with_base_url("http://localhost:9000")),
            "http://localhost:9000"
        );
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: BootstrapConfig = serde_yaml::from_str("name: wtt01\nversion: 1.0.0\n").unwrap();
        assert_eq!(config.format, ArchiveFormat::Gzip);
        assert_eq!(config.compatibility, Compatibility::Standard);
        assert!(config.timeout().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_deserialize_complete() {
        let yaml = r#"
name: exondb
version: 0.3.9
format: zip
compatibility: legacy_abi
base_url: https://dbe.example.com
timeout_secs: 30
"#;
        let config: BootstrapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.format, ArchiveFormat::Zip);
        assert_eq!(config.compatibility, Compatibility::LegacyAbi);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BootstrapConfig::new("", "1").validate().is_err());
        assert!(BootstrapConfig::new("exon-db", "1").validate().is_err());
        assert!(BootstrapConfig::new("exondb", " ").validate().is_err());
        assert!(BootstrapConfig::new("exondb", "1/2").validate().is_err());

        let mut config = BootstrapConfig::new("exondb", "1");
        config.sha256 = Some("abc".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "sha256", .. })
        ));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extload.yml");

        let mut original = BootstrapConfig::new("exondb", "0.3.9");
        original.format = ArchiveFormat::Zip;
        original.timeout_secs = Some(60);
        original.save(&path).unwrap();

        let loaded = BootstrapConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file() {
        let err = BootstrapConfig::load("/nonexistent/extload.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
