//! TTL sweep task.
//!
//! Background task that periodically removes expired records from a store.
//! Reads already hide expired records on their own; the sweep only reclaims
//! memory for records nobody asks about.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use super::store::{CacheRecord, SideIndex, Store};

/// Something that can drop its expired records.
pub trait Sweep: Send + Sync + 'static {
    fn sweep_name(&self) -> &'static str;

    /// Removes expired records, returning how many went. Never fails.
    fn sweep(&self) -> usize;
}

impl<T: CacheRecord, X: SideIndex<T>> Sweep for Store<T, X> {
    fn sweep_name(&self) -> &'static str {
        self.name()
    }

    fn sweep(&self) -> usize {
        self.sweep_expired()
    }
}

/// Spawns a task that sweeps `target` every `interval`.
///
/// The first sweep happens one full interval after spawning. Abort the
/// returned handle to stop the task during shutdown.
pub fn spawn_sweeper<S: Sweep>(target: Arc<S>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(store = target.sweep_name(), interval_secs = interval.as_secs(), "starting TTL sweep task");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            target.sweep();
        }
    })
}
