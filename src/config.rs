//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$THREADLINE_CONFIG` (environment variable)
//! 2. `~/.config/threadline/config.toml` (Linux),
//!    `~/Library/Application Support/threadline/config.toml` (macOS),
//!    `%APPDATA%\threadline\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The library functions never read configuration themselves; the values
//! here are turned into a `NormalizationContext`, `SegmentOptions` and
//! `EstimatorConfig` by the caller.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::estimate::{EstimatorConfig, DEFAULT_MAX_CONFIDENT_REMAINING, DEFAULT_MIN_SAMPLE_SIZE};
use crate::i18n::Lang;
use crate::model::context::{NormalizationContext, PhonePolicy};
use crate::segment::{SegmentOptions, SortOrder};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Who counts as an agent.
    pub identity: IdentityConfig,
    /// Thread segmentation.
    pub segment: SegmentConfig,
    /// Completeness estimation thresholds.
    pub estimate: EstimateConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Card order: "desc" (newest first) or "asc" (chronological).
    pub sort_order: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Label language: "en" or "no". Unset means detect from the environment.
    pub lang: Option<String>,
}

/// Organization-wide agent identities, merged into every context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub agent_emails: Vec<String>,
    pub agent_domains: Vec<String>,
    pub agent_phones: Vec<String>,
    /// "ignore" or "match-agent-phones".
    pub phone_policy: PhonePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Expand quoted history into synthetic cards by default.
    pub enabled: bool,
    /// Seconds between inferred timestamps of synthetic cards.
    pub synthetic_offset_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    pub min_sample_size: usize,
    pub max_confident_remaining: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            sort_order: "desc".to_string(),
            cache_dir: None,
            lang: None,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            synthetic_offset_secs: 1,
        }
    }
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            max_confident_remaining: DEFAULT_MAX_CONFIDENT_REMAINING,
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────

impl Config {
    /// Merge the configured agent identities into `base`.
    pub fn context(&self, base: NormalizationContext) -> NormalizationContext {
        let mut ctx = base.with_phone_policy(self.identity.phone_policy);
        for email in &self.identity.agent_emails {
            ctx = ctx.with_agent_email(email);
        }
        for domain in &self.identity.agent_domains {
            ctx = ctx.with_agent_domain(domain);
        }
        for phone in &self.identity.agent_phones {
            ctx = ctx.with_agent_phone(phone);
        }
        ctx
    }

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            synthetic_offset: Duration::seconds(i64::from(self.segment.synthetic_offset_secs.max(1))),
        }
    }

    pub fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig {
            min_sample_size: self.estimate.min_sample_size,
            max_confident_remaining: self.estimate.max_confident_remaining,
        }
    }

    /// Configured sort order; unknown values fall back to newest first.
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_code(&self.general.sort_order).unwrap_or_default()
    }

    /// Configured label language, if set and recognized.
    pub fn lang(&self) -> Option<Lang> {
        self.general.lang.as_deref().and_then(Lang::from_code)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    save_config_to(config, &path)
}

/// Save configuration to a specific file, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("THREADLINE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("threadline").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threadline")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("threadline.log")
}
