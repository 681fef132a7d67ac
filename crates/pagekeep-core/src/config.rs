use crate::error::{PagekeepError, Result};
use crate::policy::{BucketScope, RetentionPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "pagekeep.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PAGEKEEP_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagekeepConfig {
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
    #[serde(default = "default_weekly_cutoff_days")]
    pub weekly_cutoff_days: u32,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub bucket_scope: BucketScope,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
            weekly_cutoff_days: default_weekly_cutoff_days(),
            log_file: default_log_file(),
            bucket_scope: BucketScope::default(),
        }
    }
}

impl RetentionConfig {
    /// Build the validated selection policy from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`PagekeepError::InvalidRetentionWindow`] when the full
    /// retention window extends past the weekly cutoff.
    pub fn policy(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.recent_days, self.weekly_cutoff_days, self.bucket_scope)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            debug_dir: default_debug_dir(),
        }
    }
}

/// Where the config comes from and whether its absence is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub required: bool,
}

fn resolve_config_source_inner(cli_path: Option<&Path>, env_path: Option<&str>) -> ConfigSource {
    if let Some(path) = cli_path {
        return ConfigSource {
            path: path.to_path_buf(),
            required: true,
        };
    }

    if let Some(path) = env_path.map(str::trim).filter(|p| !p.is_empty()) {
        return ConfigSource {
            path: PathBuf::from(path),
            required: true,
        };
    }

    ConfigSource {
        path: PathBuf::from(DEFAULT_CONFIG_FILE),
        required: false,
    }
}

/// Resolve the config file location.
///
/// Precedence:
/// 1. `--config` flag
/// 2. `PAGEKEEP_CONFIG` env var
/// 3. `pagekeep.toml` in the working directory (optional)
#[must_use]
pub fn resolve_config_source(cli_path: Option<&Path>) -> ConfigSource {
    let env_val = env::var(CONFIG_ENV_VAR).ok();
    resolve_config_source_inner(cli_path, env_val.as_deref())
}

/// Load configuration from `source`, falling back to defaults when an
/// optional file is absent.
///
/// # Errors
///
/// Fails when a required file is missing, unreadable, not valid TOML, or
/// describes an inconsistent retention window.
pub fn load_config(source: &ConfigSource) -> Result<PagekeepConfig> {
    let path = &source.path;
    if !path.exists() {
        if source.required {
            return Err(PagekeepError::ConfigNotFound(path.clone()));
        }
        return Ok(PagekeepConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| PagekeepError::ConfigRead {
        path: path.clone(),
        source,
    })?;

    let config = parse_config(&content).map_err(|source| PagekeepError::ConfigParse {
        path: path.clone(),
        source,
    })?;

    config.retention.policy()?;
    Ok(config)
}

fn parse_config(content: &str) -> std::result::Result<PagekeepConfig, toml::de::Error> {
    toml::from_str::<PagekeepConfig>(content)
}

const fn default_recent_days() -> u32 {
    90
}

const fn default_weekly_cutoff_days() -> u32 {
    365
}

fn default_log_file() -> PathBuf {
    PathBuf::from("retention.log")
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("debug-responses")
}
