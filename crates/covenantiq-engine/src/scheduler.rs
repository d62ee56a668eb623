//! Interval refresh of alerts.
//!
//! Each tick recomputes covenants whose latest measurement changed since
//! their last successful evaluation, plus every covenant with an open alert
//! so its severity and countdown follow the calendar. Resolved alerts still
//! re-open only on newer evidence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::engine::CovenantEngine;
use crate::recompute::RecomputeMode;

/// Spawns the refresh loop. It stops when `shutdown_rx` fires.
pub(crate) fn spawn_refresh_loop(
    engine: Arc<CovenantEngine>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!("Started refresh scheduler every {:?}", period);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match engine.recompute(RecomputeMode::Due).await {
                        Ok(report) if report.is_complete() => {
                            debug!("Scheduled refresh evaluated {} covenants", report.covenants_evaluated);
                        }
                        Ok(report) => {
                            warn!("Scheduled refresh incomplete, failed: {:?}", report.failed_ids());
                        }
                        Err(e) => error!("Scheduled refresh failed: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Refresh scheduler shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenantiq_ext_file::create_memory_storage;
    use covenantiq_traits::config::EngineConfig;

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let config = EngineConfig {
            refresh_interval_secs: 3600,
            ..EngineConfig::default()
        };
        let engine = Arc::new(CovenantEngine::new(config, create_memory_storage()));
        let handle = engine.start().expect("scheduler enabled");
        engine.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_interval_starts_nothing() {
        let config = EngineConfig {
            refresh_interval_secs: 0,
            ..EngineConfig::default()
        };
        let engine = Arc::new(CovenantEngine::new(config, create_memory_storage()));
        assert!(engine.start().is_none());
    }
}
