//! Measurement runs driven from the command line

use crate::output::OutputManager;
use anyhow::{Context, Result};
use meter::{CancellationToken, JitterMeter, ProgressEvent, StatsRecord, Target, preallocated_samples};
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// Everything one finished (or cancelled) run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: Target,
    pub stats: StatsRecord,
    pub events: Vec<ProgressEvent>,
    pub cancelled: bool,
}

/// Cancel `cancel` on the first Ctrl+C
pub fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping measurement");
            cancel.cancel();
        }
    });
}

/// Measure one target, printing progress as samples arrive
pub async fn run_target(
    meter: &JitterMeter,
    target: &Target,
    cancel: &CancellationToken,
    output: &OutputManager,
) -> Result<RunOutcome> {
    info!("Measuring {} ({})", target.display_name, target.id);

    let mut run = meter.spawn(target.clone(), cancel.clone());
    let total = meter.config().sample_count;
    let mut events = Vec::with_capacity(preallocated_samples(total));

    while let Some(event) = run.events().next().await {
        output.progress(target, &event);
        events.push(event);
    }

    let stats = run
        .finish()
        .await
        .with_context(|| format!("Measurement of {} failed", target.id))?;

    Ok(RunOutcome {
        target: target.clone(),
        stats,
        cancelled: events.len() < total as usize,
        events,
    })
}

/// Measure targets one after another; stops starting new runs once cancelled
pub async fn run_batch(
    meter: &JitterMeter,
    targets: &[Target],
    cancel: &CancellationToken,
    output: &OutputManager,
) -> Result<Vec<RunOutcome>> {
    let mut outcomes = Vec::with_capacity(targets.len());

    for target in targets {
        if cancel.is_cancelled() {
            warn!("Batch cancelled, skipping {} remaining target(s)", targets.len() - outcomes.len());
            break;
        }
        outcomes.push(run_target(meter, target, cancel, output).await?);
    }

    Ok(outcomes)
}
