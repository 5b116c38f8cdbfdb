//! Periodic cleanup of in-memory state: idle visitor contexts and unwatched live hubs.

use std::time::Duration;

use tokio::{task::JoinHandle, time};
use tracing::debug;

use crate::state::SharedState;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub visitors: usize,
    pub hubs: usize,
}

/// Evict idle visitors and drop live hubs nobody subscribes to.
pub fn sweep(state: &SharedState) -> SweepReport {
    SweepReport {
        visitors: state.evict_idle_visitors(),
        hubs: state.live().prune(),
    }
}

/// Run [`sweep`] in the background, twice per idle timeout and at least once a minute.
pub fn spawn_housekeeping(state: SharedState) -> JoinHandle<()> {
    let period = (state.config().visitor_idle_timeout() / 2)
        .clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = sweep(&state);
            if report != SweepReport::default() {
                debug!(
                    visitors = report.visitors,
                    hubs = report.hubs,
                    "evicted idle in-memory state"
                );
            }
        }
    })
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        services::{flow_service, test_support::test_state_with},
    };

    #[tokio::test]
    async fn background_sweep_forgets_idle_visitors() {
        let state = test_state_with(
            AppConfig::default().with_visitor_idle_timeout(Duration::from_millis(40)),
        );
        let visits = 100;
        let mut ids = Vec::with_capacity(visits);
        for _ in 0..visits {
            ids.push(flow_service::open_visit(&state, None).await.unwrap().visitor_id);
        }

        let handle = spawn_housekeeping(state.clone());
        time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        assert!(ids.iter().all(|id| !state.has_visitor(*id)));
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_visitors_and_drops_unwatched_hubs() {
        let state = test_state_with(AppConfig::default());
        let id = flow_service::open_visit(&state, None)
            .await
            .unwrap()
            .visitor_id;
        drop(state.live().subscribe(uuid::Uuid::new_v4()));

        let report = sweep(&state);
        assert_eq!(report, SweepReport { visitors: 0, hubs: 1 });
        assert!(state.has_visitor(id));
    }
}
