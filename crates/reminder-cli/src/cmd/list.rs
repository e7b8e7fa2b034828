use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, Utc};
use reminder_core::window::{days_until, Stage};
use reminder_core::{Progress, Reminder, ReminderStore};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Serialize)]
struct Entry {
    id: Uuid,
    title: String,
    target_date: Option<DateTime<Utc>>,
    days_until: Option<i64>,
    stage: Option<Stage>,
    recurring: bool,
    owner: Option<String>,
    progress: Progress,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = reminder_core::config::Config::load(root).context("failed to load config")?;
    let offset = config
        .scheduler
        .offset()
        .context("invalid scheduler.utc_offset_minutes")?;
    let db = super::open_db(root, &config)?;

    let fetched = db.fetch_all().context("failed to load reminders")?;
    for bad in &fetched.unreadable {
        tracing::warn!("skipping unreadable reminder {}: {}", bad.id, bad.reason);
    }
    let mut reminders = fetched.reminders;
    reminders.sort_by_key(|r| (r.target_date.is_none(), r.target_date));

    let now = Utc::now();
    let entries: Vec<Entry> = reminders
        .into_iter()
        .map(|r: Reminder| {
            let days = r.target_date.map(|t| days_until(t, now, &offset));
            Entry {
                id: r.id,
                title: r.title,
                target_date: r.target_date,
                days_until: days,
                stage: days.map(Stage::for_days),
                recurring: r.recurring,
                owner: r.owner.map(|o| o.email),
                progress: r.progress,
            }
        })
        .collect();

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No reminders.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string()[..8].to_string(),
                e.title.clone(),
                e.target_date
                    .map(|t| t.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unreadable".to_string()),
                e.days_until.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                e.stage.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                format!("{}/5", e.progress.sent_count()),
                if e.recurring { "yes" } else { "no" }.to_string(),
                e.owner.clone().unwrap_or_else(|| "(missing)".into()),
            ]
        })
        .collect();
    print_table(
        &["ID", "TITLE", "TARGET", "DAYS", "STAGE", "SENT", "YEARLY", "OWNER"],
        rows,
    );
    Ok(())
}
