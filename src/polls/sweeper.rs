//! Expiry Sweeper
//!
//! Background task that periodically evicts polls older than the configured
//! timeout. Expired polls simply vanish; participants get no notification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::polls::store::PollStore;

/// Spawn the recurring sweep task.
///
/// Ticks at `interval` regardless of poll-specific timeouts and calls
/// `sweep_expired` each tick. Runs until the returned handle is aborted or
/// the runtime shuts down.
pub fn spawn(store: Arc<PollStore>, timeout: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = store.sweep_expired(Instant::now(), timeout);
            if evicted > 0 {
                tracing::debug!(evicted, remaining = store.active_polls(), "expired polls swept");
            }
        }
    })
}
