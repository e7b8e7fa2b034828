//! Bulk-load owners and reminders from a JSON file.
//!
//! ```json
//! {
//!   "owners":    [{ "name": "Ada", "email": "ada@example.com" }],
//!   "reminders": [{ "title": "Dentist", "target_date": "2030-03-10T09:00:00Z",
//!                   "owner_email": "ada@example.com", "recurring": false }]
//! }
//! ```
//!
//! Owners are matched by email, so importing the same file twice does not
//! duplicate them. Reminders are always inserted as new records.

use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use reminder_core::{Owner, Reminder, ReminderStore, SaveOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Deserialize)]
struct ImportFile {
    #[serde(default)]
    owners: Vec<ImportOwner>,
    #[serde(default)]
    reminders: Vec<ImportReminder>,
}

#[derive(Deserialize)]
struct ImportOwner {
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct ImportReminder {
    title: String,
    target_date: DateTime<Utc>,
    owner_email: String,
    #[serde(default)]
    recurring: bool,
}

#[derive(Serialize)]
struct Rejected {
    title: String,
    reason: String,
}

#[derive(Serialize)]
struct ImportSummary {
    owners_created: usize,
    reminders_imported: usize,
    rejected: Vec<Rejected>,
}

pub fn run(root: &Path, file: &Path, validate: bool, json: bool) -> anyhow::Result<()> {
    let data =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let input: ImportFile = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let config = reminder_core::config::Config::load(root).context("failed to load config")?;
    let db = super::open_db(root, &config)?;

    let mut by_email: HashMap<String, Uuid> = db
        .list_owners()
        .context("failed to list owners")?
        .into_iter()
        .map(|o| (o.email.to_lowercase(), o.id))
        .collect();

    let mut summary = ImportSummary {
        owners_created: 0,
        reminders_imported: 0,
        rejected: Vec::new(),
    };

    for o in input.owners {
        let key = o.email.to_lowercase();
        if by_email.contains_key(&key) {
            continue;
        }
        let owner = Owner::new(o.name, o.email);
        db.save_owner(&owner)
            .with_context(|| format!("failed to save owner {}", owner.email))?;
        by_email.insert(key, owner.id);
        summary.owners_created += 1;
    }

    let opts = SaveOptions { validate };
    for r in input.reminders {
        let Some(&owner_id) = by_email.get(&r.owner_email.to_lowercase()) else {
            summary.rejected.push(Rejected {
                title: r.title,
                reason: format!("unknown owner '{}'", r.owner_email),
            });
            continue;
        };
        let reminder = Reminder::new(r.title, r.target_date, owner_id, r.recurring);
        match db.save(&reminder, opts) {
            Ok(()) => summary.reminders_imported += 1,
            Err(e) => summary.rejected.push(Rejected {
                title: reminder.title,
                reason: e.to_string(),
            }),
        }
    }

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Imported {} reminders ({} new owners).",
            summary.reminders_imported, summary.owners_created
        );
        for r in &summary.rejected {
            println!("  rejected '{}': {}", r.title, r.reason);
        }
    }

    if !summary.rejected.is_empty() {
        anyhow::bail!("{} reminders were rejected", summary.rejected.len());
    }
    Ok(())
}
