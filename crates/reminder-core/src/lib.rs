pub mod action;
pub mod config;
pub mod db;
pub mod error;
pub mod io;
pub mod notification;
pub mod paths;
pub mod store;
pub mod types;
pub mod window;

pub use action::{decide, Action};
pub use db::ReminderDb;
pub use error::{ReminderError, Result};
pub use notification::Notification;
pub use store::{Fetched, MemoryStore, ReminderStore, SaveOptions, UnreadableRecord};
pub use types::{Owner, Progress, Reminder};
pub use window::Stage;
