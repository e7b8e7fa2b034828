//! Single-flight driver: one pass at startup, then one per tick.
//!
//! A tick that arrives while a pass is still running is dropped, never queued
//! and never run concurrently, so two passes can never race on the same
//! reminder.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::engine::LifecycleEngine;
use crate::report::PassReport;

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next trigger. `false` means no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker. The first tick fires immediately.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// A zero `period` is raised to one millisecond.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker driven by hand through a [`TickHandle`]. Ends when every handle is
/// dropped.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (TickHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TickHandle { tx }, Self { rx })
    }
}

impl TickHandle {
    /// Returns `false` if the ticker is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    pub passes_started: u64,
    pub passes_finished: u64,
    pub ticks_skipped: u64,
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    finished: AtomicU64,
    skipped: AtomicU64,
}

/// Clears the running flag when the pass task ends, even by panic.
struct RunToken(Arc<AtomicBool>);

impl Drop for RunToken {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    engine: Arc<LifecycleEngine>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    reports: Option<mpsc::UnboundedSender<PassReport>>,
}

impl Scheduler {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            reports: None,
        }
    }

    /// Forward every finished pass report to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<PassReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DriverStats {
        DriverStats {
            passes_started: self.counters.started.load(Ordering::Relaxed),
            passes_finished: self.counters.finished.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Start a pass unless one is already in flight.
    pub fn try_start(&self) -> Option<JoinHandle<PassReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            warn!("previous reminder pass still running; skipping this tick");
            return None;
        }
        self.counters.started.fetch_add(1, Ordering::Relaxed);

        let token = RunToken(self.running.clone());
        let engine = self.engine.clone();
        let counters = self.counters.clone();
        let reports = self.reports.clone();
        Some(tokio::spawn(async move {
            let _token = token;
            let report = engine.run_pass().await;
            counters.finished.fetch_add(1, Ordering::Relaxed);
            if let Some(tx) = reports {
                let _ = tx.send(report.clone());
            }
            report
        }))
    }

    /// Drive passes from `ticker` until it ends or `shutdown` resolves, then
    /// wait for the in-flight pass (if any) to finish.
    pub async fn run<T, S>(&self, mut ticker: T, shutdown: S) -> DriverStats
    where
        T: Ticker,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut in_flight: Option<JoinHandle<PassReport>> = None;

        info!("reminder scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("reminder scheduler shutting down");
                    break;
                }
                more = ticker.tick() => {
                    if !more {
                        break;
                    }
                    if let Some(handle) = self.try_start() {
                        in_flight = Some(handle);
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("waiting for the running reminder pass to finish");
            }
            if let Err(e) = handle.await {
                warn!("reminder pass task failed: {e}");
            }
        }
        self.stats()
    }
}
