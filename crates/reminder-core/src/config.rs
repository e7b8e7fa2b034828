use crate::error::Result;
use crate::paths;
use crate::window::{self, MAX_OFFSET_MINUTES};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Offset in which calendar days are counted.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_interval_secs() -> u64 {
    60 * 60
}

fn default_pass_timeout_secs() -> u64 {
    15 * 60
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_max_parallel() -> usize {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pass_timeout_secs: default_pass_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            max_parallel: default_max_parallel(),
            utc_offset_minutes: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        window::offset_from_minutes(self.utc_offset_minutes)
    }
}

// ---------------------------------------------------------------------------
// SenderConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SenderConfig {
    /// Log the rendered notification and report success.
    Log,
    /// POST the rendered notification as JSON to an outbound relay.
    Webhook {
        url: String,
        #[serde(default = "default_webhook_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::Log
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sender: SenderConfig,
}

fn default_version() -> u32 {
    1
}

fn default_database() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DB_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: default_database(),
            scheduler: SchedulerConfig::default(),
            sender: SenderConfig::default(),
        }
    }
}

impl Config {
    /// Load `.reminders/config.yaml` under `root`; a missing file yields defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!("no config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        paths::db_path(root, &self.database)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let s = &self.scheduler;

        if s.interval_secs == 0 {
            warnings.push(ConfigWarning::error("scheduler.interval_secs must be > 0"));
        } else if s.interval_secs < 60 {
            warnings.push(ConfigWarning::warning(format!(
                "scheduler.interval_secs={} (<60 is unusually frequent)",
                s.interval_secs
            )));
        }

        if s.max_parallel == 0 {
            warnings.push(ConfigWarning::error("scheduler.max_parallel must be > 0"));
        }

        if s.send_timeout_secs == 0 {
            warnings.push(ConfigWarning::error(
                "scheduler.send_timeout_secs must be > 0",
            ));
        }

        if s.send_timeout_secs >= s.pass_timeout_secs {
            warnings.push(ConfigWarning::warning(format!(
                "scheduler.send_timeout_secs={} is not below pass_timeout_secs={}",
                s.send_timeout_secs, s.pass_timeout_secs
            )));
        }

        if s.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            warnings.push(ConfigWarning::error(format!(
                "scheduler.utc_offset_minutes={} is outside ±{MAX_OFFSET_MINUTES}",
                s.utc_offset_minutes
            )));
        }

        if let SenderConfig::Webhook { url, timeout_secs } = &self.sender {
            if url.trim().is_empty() {
                warnings.push(ConfigWarning::error("sender.url is empty"));
            } else if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning::error(format!(
                    "sender.url '{url}' must start with http:// or https://"
                )));
            }
            if *timeout_secs > s.send_timeout_secs {
                warnings.push(ConfigWarning::warning(format!(
                    "sender.timeout_secs={timeout_secs} exceeds scheduler.send_timeout_secs={}",
                    s.send_timeout_secs
                )));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
