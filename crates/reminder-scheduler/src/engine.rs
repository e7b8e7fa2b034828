//! One scheduling pass over every stored reminder.
//!
//! Each reminder is decided up front (pure, see [`reminder_core::decide`]) and
//! then applied on its own task. Tasks are bounded by a semaphore and the whole
//! pass by a deadline. Within one reminder the order is always
//! send → mark flag → save, so a flag is never persisted for a delivery that
//! did not happen.
//!
//! A pass cut short by its deadline still waits for store calls already
//! running on the blocking pool, so no write from one pass lands in the next.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use reminder_core::action::catch_up;
use reminder_core::config::SchedulerConfig;
use reminder_core::{
    decide, Action, Fetched, Notification, Reminder, ReminderStore, SaveOptions, Stage,
};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::DispatchError;
use crate::report::{Outcome, PassReport};
use crate::sender::NotificationSender;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub send_timeout: Duration,
    pub pass_timeout: Duration,
    pub max_parallel: usize,
    pub offset: FixedOffset,
}

impl EngineConfig {
    pub fn from_scheduler(cfg: &SchedulerConfig) -> reminder_core::Result<Self> {
        Ok(Self {
            send_timeout: cfg.send_timeout(),
            pass_timeout: cfg.pass_timeout(),
            max_parallel: cfg.max_parallel.max(1),
            offset: cfg.offset()?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            pass_timeout: Duration::from_secs(15 * 60),
            max_parallel: 4,
            offset: Utc.fix(),
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleEngine
// ---------------------------------------------------------------------------

/// Upper bound on store calls in flight at once; also the number of permits
/// drained to wait out calls left running by aborted tasks.
const STORE_CALL_SLOTS: u32 = 1024;

/// Shared pieces each per-reminder task needs.
#[derive(Clone)]
struct Collaborators {
    store: Arc<dyn ReminderStore>,
    sender: Arc<dyn NotificationSender>,
    /// Each blocking store call holds one permit until it returns.
    store_calls: Arc<Semaphore>,
    send_timeout: Duration,
    offset: FixedOffset,
}

pub struct LifecycleEngine {
    collab: Collaborators,
    clock: Arc<dyn Clock>,
    pass_timeout: Duration,
    max_parallel: usize,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            collab: Collaborators {
                store,
                sender,
                store_calls: Arc::new(Semaphore::new(STORE_CALL_SLOTS as usize)),
                send_timeout: config.send_timeout,
                offset: config.offset,
            },
            clock,
            pass_timeout: config.pass_timeout,
            max_parallel: config.max_parallel.max(1),
        }
    }

    /// Evaluate every reminder once. Never fails: problems land in the report.
    pub async fn run_pass(&self) -> PassReport {
        let now = self.clock.now();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.pass_timeout;
        let mut report = PassReport::new(now);
        info!("reminder pass started at {now}");

        let Fetched {
            reminders,
            unreadable,
        } = match run_store(&self.collab, |s| s.fetch_all()).await {
            Ok(f) => f,
            Err(e) => {
                error!("could not load reminders: {e}");
                report.load_error = Some(e.to_string());
                report.duration_ms = elapsed_ms(started);
                return report;
            }
        };
        report.processed = reminders.len() + unreadable.len();

        for bad in unreadable {
            warn!(reminder = %bad.id, "reminder not processed: stored record unreadable");
            let title = bad.title.unwrap_or_else(|| "(unreadable)".to_string());
            report.record(
                bad.id,
                &title,
                Action::Quarantine,
                Err(DispatchError::Unreadable(bad.reason)),
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut handles = Vec::with_capacity(reminders.len());
        for reminder in reminders {
            let action = decide(&reminder, now, &self.collab.offset);
            debug!(reminder = %reminder.id, title = %reminder.title, ?action, "decided");

            let id = reminder.id;
            let title = reminder.title.clone();
            let sem = semaphore.clone();
            let collab = self.collab.clone();
            let handle = tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| DispatchError::Task("semaphore closed".into()))?;
                apply(&collab, reminder, action, now).await
            });
            handles.push((id, title, action, handle));
        }

        for (id, title, action, mut handle) in handles {
            let result = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(DispatchError::Task(format!("task join error: {join_err}"))),
                Err(_) => {
                    handle.abort();
                    report.timed_out = true;
                    report.unfinished += 1;
                    continue;
                }
            };
            if let Err(e) = &result {
                warn!(reminder = %id, title = %title, "reminder not processed: {e}");
            }
            report.record(id, &title, action, result);
        }

        if report.timed_out {
            warn!(
                "reminder pass hit its {:?} deadline with {} reminders unfinished",
                self.pass_timeout, report.unfinished
            );
            // Aborting a task does not stop a store call it already handed to
            // the blocking pool; wait for those before the pass counts as over.
            if let Err(e) = self.collab.store_calls.acquire_many(STORE_CALL_SLOTS).await {
                error!("could not wait for in-flight store calls: {e}");
            }
        }
        report.duration_ms = elapsed_ms(started);
        info!("{report}");
        report
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

async fn apply(
    collab: &Collaborators,
    reminder: Reminder,
    action: Action,
    now: DateTime<Utc>,
) -> Result<Outcome, DispatchError> {
    match action {
        Action::Skip => Ok(Outcome::Skipped),
        Action::Quarantine => Err(DispatchError::MalformedDate),
        Action::Delete => {
            let id = reminder.id;
            let existed = run_store(collab, move |s| s.delete(id)).await?;
            if !existed {
                debug!(reminder = %id, "already deleted");
            }
            Ok(Outcome::Deleted)
        }
        Action::RollForward => {
            let mut reminder = reminder;
            let years =
                catch_up(&mut reminder, now, &collab.offset).map_err(DispatchError::Rollover)?;
            info!(reminder = %reminder.id, years, "recurring reminder re-armed");
            save_unvalidated(collab, reminder).await?;
            Ok(Outcome::RolledForward { years })
        }
        Action::Notify { stage, days } => notify(collab, reminder, stage, days).await,
    }
}

async fn notify(
    collab: &Collaborators,
    mut reminder: Reminder,
    stage: Stage,
    days: i64,
) -> Result<Outcome, DispatchError> {
    let notification =
        Notification::render(&reminder, stage, days, &collab.offset).map_err(DispatchError::Render)?;

    match tokio::time::timeout(collab.send_timeout, collab.sender.deliver(&notification)).await {
        Err(_) => return Err(DispatchError::DeliveryTimeout(collab.send_timeout)),
        Ok(Err(e)) => return Err(DispatchError::Delivery(e)),
        Ok(Ok(())) => {}
    }
    info!(reminder = %reminder.id, %stage, to = %notification.to, "notification delivered");

    reminder.progress.mark_sent(stage);
    save_unvalidated(collab, reminder.clone())
        .await
        .map_err(DispatchError::after_send)?;

    if stage == Stage::Today && reminder.recurring {
        reminder
            .roll_forward(&collab.offset)
            .map_err(DispatchError::Rollover)?;
        save_unvalidated(collab, reminder)
            .await
            .map_err(|e| match e {
                DispatchError::Store(e) => DispatchError::Rollover(e),
                other => other,
            })?;
        return Ok(Outcome::NotifiedAndRolled { stage });
    }
    Ok(Outcome::Notified { stage })
}

async fn save_unvalidated(collab: &Collaborators, reminder: Reminder) -> Result<(), DispatchError> {
    run_store(collab, move |s| s.save(&reminder, SaveOptions::UNVALIDATED)).await
}

/// Run a synchronous store call on the blocking pool. The call holds a
/// `store_calls` permit until it returns, even if the awaiting task is aborted.
async fn run_store<T, F>(collab: &Collaborators, f: F) -> Result<T, DispatchError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ReminderStore) -> reminder_core::Result<T> + Send + 'static,
{
    let permit = collab
        .store_calls
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| DispatchError::Task("store call gate closed".into()))?;
    let store = Arc::clone(&collab.store);
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        f(store.as_ref())
    })
    .await
    .map_err(|e| DispatchError::Task(format!("task join error: {e}")))?
    .map_err(DispatchError::Store)
}
