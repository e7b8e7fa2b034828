use anyhow::Context;
use reminder_core::{config::Config, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing reminders in: {}", root.display());

    let config = if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load config")?
    } else {
        let config = Config::default();
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        config
    };

    let db_path = config.db_path(root);
    let existed = db_path.exists();
    super::open_db(root, &config)?;
    let shown = db_path.strip_prefix(root).unwrap_or(&db_path);
    if existed {
        println!("  exists:  {}", shown.display());
    } else {
        println!("  created: {}", shown.display());
    }
    Ok(())
}
