//! Repeated runs on a fixed interval.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::CtoWorkflow;

/// Run `workflow` every `period` until `cancel` fires. Returns the number of runs.
///
/// The first run starts immediately. Runs never overlap: a slow run delays
/// the next tick instead of stacking up. A run in progress is finished
/// before cancellation is observed.
pub async fn run_on_schedule(
    workflow: &CtoWorkflow,
    period: Duration,
    cancel: CancellationToken,
) -> usize {
    if period.is_zero() {
        tracing::warn!("Schedule interval is zero; not scheduling any runs");
        return 0;
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = workflow.run().await;
        runs += 1;
        tracing::info!(
            run = runs,
            tasks_processed = result.tasks_processed,
            errors = result.errors.len(),
            "Scheduled run finished, next in {:?}",
            period
        );
    }

    tracing::info!(runs, "Scheduler stopped");
    runs
}
