use reminder_scheduler::{IntervalTicker, Scheduler};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let config = super::load_checked_config(root)?;
    let engine = Arc::new(super::build_engine(root, &config)?);
    let interval = config.scheduler.interval();

    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(async move {
        let scheduler = Scheduler::new(engine);
        info!("running a reminder pass every {interval:?}; press ctrl-c to stop");
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("could not listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        };
        scheduler.run(IntervalTicker::new(interval), shutdown).await
    });

    println!(
        "Stopped after {} passes ({} ticks skipped).",
        stats.passes_finished, stats.ticks_skipped
    );
    Ok(())
}
