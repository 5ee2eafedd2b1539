//! Configuration file support for prepcoach.
//!
//! Loads `prepcoach.toml` from `--config` or `~/.config/prepcoach/`.
//! Every section is optional; missing values fall back to defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use prepcoach_ai::{HttpTransportConfig, RetryPolicy};
use prepcoach_core::ReportPolicy;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "prepcoach.toml";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CoachConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation endpoint settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReportConfig {
    pub pass_threshold: u8,
    pub strength_cutoff: u8,
    pub weakness_cutoff: u8,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let policy = ReportPolicy::default();
        Self {
            pass_threshold: policy.pass_threshold,
            strength_cutoff: policy.strength_cutoff,
            weakness_cutoff: policy.weakness_cutoff,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct StorageConfig {
    /// Database file; the platform data directory when unset
    pub database: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Directory for the daily-rolling diagnostic log and the session event log
    pub dir: Option<PathBuf>,
}

impl CoachConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the user config file is read
    /// when present, and defaults are used when it is not. A file that
    /// fails to parse is a hard error either way.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: CoachConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prepcoach").join(CONFIG_FILE_NAME))
    }

    /// Log directory: the command-line value wins over `[logging] dir`.
    pub fn log_dir(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.logging.dir.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
        )
    }

    pub fn report_policy(&self) -> ReportPolicy {
        ReportPolicy {
            pass_threshold: self.report.pass_threshold,
            strength_cutoff: self.report.strength_cutoff,
            weakness_cutoff: self.report.weakness_cutoff,
        }
    }

    /// Build the transport settings, reading the API key from the environment.
    pub fn transport_config(&self) -> Result<HttpTransportConfig> {
        let api_key = std::env::var(&self.ai.api_key_env).with_context(|| {
            format!(
                "No API key found. Set the {} environment variable.",
                self.ai.api_key_env
            )
        })?;

        Ok(HttpTransportConfig {
            endpoint: self.ai.endpoint.clone(),
            model: self.ai.model.clone(),
            api_key,
            timeout: Duration::from_secs(self.ai.timeout_secs),
        })
    }
}
