//! `reminder-scheduler`: async lifecycle engine for stored reminders.
//!
//! ```text
//! Scheduler        ← single-flight: startup pass, then one per tick
//!     │
//!     ▼
//! LifecycleEngine  ← fetch all, decide each, apply each on its own task
//!     │                (bounded fan-out, per-send and per-pass deadlines)
//!     ├── ReminderStore        (reminder-core; sync, run on the blocking pool)
//!     └── NotificationSender   (log or webhook)
//! ```
//!
//! A pass never fails as a whole: every per-reminder problem is collected in
//! the returned [`PassReport`].

pub mod clock;
pub mod driver;
pub mod engine;
pub mod error;
pub mod report;
pub mod sender;


pub use clock::{Clock, FixedClock, SystemClock};
pub use driver::{DriverStats, IntervalTicker, ManualTicker, Scheduler, TickHandle, Ticker};
pub use engine::{EngineConfig, LifecycleEngine};
pub use error::{DispatchError, SendError};
pub use report::{ItemError, Outcome, PassReport};
pub use sender::{from_config as sender_from_config, LogSender, NotificationSender, WebhookSender};
