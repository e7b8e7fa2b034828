use std::path::{Path, PathBuf};

pub const REMINDERS_DIR: &str = ".reminders";
pub const CONFIG_FILE: &str = ".reminders/config.yaml";
pub const DEFAULT_DB_FILE: &str = "reminders.db";

pub fn reminders_dir(root: &Path) -> PathBuf {
    root.join(REMINDERS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve the database location. Relative names live under `.reminders/`.
pub fn db_path(root: &Path, database: &Path) -> PathBuf {
    if database.is_absolute() {
        database.to_path_buf()
    } else {
        reminders_dir(root).join(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_db_lives_under_reminders_dir() {
        let p = db_path(Path::new("/srv/app"), Path::new("reminders.db"));
        assert_eq!(p, PathBuf::from("/srv/app/.reminders/reminders.db"));
    }

    #[test]
    fn absolute_db_is_kept() {
        let p = db_path(Path::new("/srv/app"), Path::new("/var/lib/r.db"));
        assert_eq!(p, PathBuf::from("/var/lib/r.db"));
    }
}
