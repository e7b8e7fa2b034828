use crate::output::print_json;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, owners: bool, json: bool) -> anyhow::Result<()> {
    let config = reminder_core::config::Config::load(root).context("failed to load config")?;
    let db = super::open_db(root, &config)?;
    let deleted = db.purge(owners).context("failed to purge database")?;

    if json {
        print_json(&serde_json::json!({
            "deleted": deleted,
            "owners_deleted": owners,
        }))?;
    } else if owners {
        println!("Deleted {deleted} reminders and all owners.");
    } else {
        println!("Deleted {deleted} reminders.");
    }
    Ok(())
}
