//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use linkline_mirror::{CredentialSettings, SyncOptions};
use linkline_staging::StagingConfig;
use serde::Deserialize;

/// Global configuration for linkline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub bucket: BucketConfig,
    pub staging: StagingSection,
    pub sync: SyncConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    /// Local copy of the export bucket
    #[serde(deserialize_with = "deserialize_env_path")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BucketConfig {
    /// `s3://bucket/prefix`
    #[serde(deserialize_with = "deserialize_env_var")]
    pub url: Option<String>,
    /// S3-compatible endpoint; AWS when unset
    #[serde(deserialize_with = "deserialize_env_var")]
    pub endpoint: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub region: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub access_key_id: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub secret_access_key: Option<String>,
    /// Named profile from ~/.aws/config
    #[serde(deserialize_with = "deserialize_env_var")]
    pub profile: Option<String>,
    /// JSON file with a key pair or a profile name
    #[serde(deserialize_with = "deserialize_env_path")]
    pub credentials_file: Option<PathBuf>,
    /// Unsigned requests (public buckets)
    pub anonymous: bool,
}

impl BucketConfig {
    pub fn credentials(&self) -> CredentialSettings {
        CredentialSettings {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            profile: self.profile.clone(),
            credentials_file: self.credentials_file.clone(),
            anonymous: self.anonymous,
        }
    }

    /// Which credential source applies, without secrets.
    pub fn auth_summary(&self) -> String {
        if self.access_key_id.is_some() {
            "access key".to_string()
        } else if let Some(profile) = &self.profile {
            format!("profile {profile}")
        } else if let Some(path) = &self.credentials_file {
            format!("credentials file {}", path.display())
        } else if self.anonymous {
            "anonymous".to_string()
        } else {
            "environment".to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StagingSection {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub database: Option<PathBuf>,
    pub memory_limit: String,
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            database: None,
            memory_limit: StagingConfig::default().memory_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub workers: usize,
    pub overwrite: bool,
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let defaults = SyncOptions::default();
        Self {
            workers: defaults.workers,
            overwrite: defaults.overwrite,
            max_retries: defaults.max_retries,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

fn deserialize_env_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_env_var(deserializer)?.map(PathBuf::from))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./linkline.toml (current directory)
    /// 2. ~/.config/linkline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("linkline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "linkline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Staging settings, `database` overridden when given.
    pub fn staging_config(&self, database: Option<PathBuf>, memory_limit: Option<String>) -> StagingConfig {
        StagingConfig {
            database: database.or_else(|| self.staging.database.clone()),
            memory_limit: memory_limit.unwrap_or_else(|| self.staging.memory_limit.clone()),
        }
    }
}
