pub mod config;
pub mod import;
pub mod init;
pub mod list;
pub mod pass;
pub mod purge;
pub mod run;

use anyhow::Context;
use reminder_core::config::{Config, WarnLevel};
use reminder_core::ReminderDb;
use reminder_scheduler::{sender_from_config, EngineConfig, LifecycleEngine, SystemClock};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn open_db(root: &Path, config: &Config) -> anyhow::Result<ReminderDb> {
    let path = config.db_path(root);
    ReminderDb::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

/// Load config and refuse to continue on validation errors. Warnings are logged.
pub(crate) fn load_checked_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root).context("failed to load config")?;
    let mut errors = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => warn!("config: {}", w.message),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("invalid config: {}", errors.join("; "));
    }
    Ok(config)
}

pub(crate) fn build_engine(root: &Path, config: &Config) -> anyhow::Result<LifecycleEngine> {
    let db = open_db(root, config)?;
    let sender =
        sender_from_config(&config.sender).context("failed to build notification sender")?;
    let engine_config =
        EngineConfig::from_scheduler(&config.scheduler).context("invalid scheduler config")?;
    Ok(LifecycleEngine::new(
        Arc::new(db),
        sender,
        Arc::new(SystemClock),
        engine_config,
    ))
}
