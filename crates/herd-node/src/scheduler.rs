//! Background task that applies the daily reset.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::HerdEngine;

/// Poll the engine every `interval` and reset it when a cycle boundary has
/// passed. `reference_source` supplies the next cycle's admission reference
/// and is only consulted when a reset is due.
///
/// Runs until `shutdown` flips to `true` or its sender is dropped.
pub async fn run_reset_loop<F>(
    engine: Arc<HerdEngine>,
    interval: Duration,
    reference_source: F,
    mut shutdown: watch::Receiver<bool>,
) where
    F: Fn() -> Option<String> + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if engine.reset_due() && engine.reset_if_due(reference_source()) {
                    debug!("scheduled reset applied");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("reset loop stopped");
                    break;
                }
            }
        }
    }
}
