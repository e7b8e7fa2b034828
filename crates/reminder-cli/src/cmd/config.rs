use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use reminder_core::config::{Config, SenderConfig, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (defaults filled in)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }

    let s = &config.scheduler;
    println!("Database:        {}", config.db_path(root).display());
    println!("Interval:        {}s", s.interval_secs);
    println!("Pass timeout:    {}s", s.pass_timeout_secs);
    println!("Send timeout:    {}s", s.send_timeout_secs);
    println!("Max parallel:    {}", s.max_parallel);
    println!("UTC offset:      {:+} min", s.utc_offset_minutes);
    match &config.sender {
        SenderConfig::Log => println!("Sender:          log"),
        SenderConfig::Webhook { url, timeout_secs } => {
            println!("Sender:          webhook {url} (timeout {timeout_secs}s)")
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
