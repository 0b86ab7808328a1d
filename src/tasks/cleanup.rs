//! Active Expiration Task
//!
//! Background task driving a group's expiry heap on a fixed tick, so entries
//! with a TTL are removed close to their deadline instead of lingering until
//! the next access.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::group::Group;

/// Spawns the expiration task for `group`.
///
/// Every `tick` the task drains all currently-due entries; the group
/// reacquires its store lock for each entry, so other callers interleave
/// freely with a long sweep. The returned handle is aborted during shutdown.
pub fn spawn_expiration_task(group: Arc<Group>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(group = %group.name(), ?tick, "expiration task started");

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = group.sweep_expired();
            if removed > 0 {
                debug!(group = %group.name(), removed, "expired entries swept");
            }
        }
    })
}
