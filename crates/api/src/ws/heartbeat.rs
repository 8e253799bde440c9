use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ws::registry::ConnectionRegistry;

/// Spawn a background task that sweeps the registry once per `period`.
///
/// Each sweep evicts connections that never answered the previous Ping and
/// probes the rest (see [`ConnectionRegistry::sweep`]). A peer therefore
/// gets at least one full period to answer. The task runs until `cancel`
/// is triggered.
pub fn start_heartbeat(
    registry: Arc<ConnectionRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_ms = period.as_millis() as u64, "WebSocket heartbeat started");

        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("WebSocket heartbeat stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = registry.sweep().await;
                    if report.evicted > 0 {
                        tracing::info!(
                            probed = report.probed,
                            evicted = report.evicted,
                            "WebSocket heartbeat evicted unresponsive connections"
                        );
                    } else {
                        tracing::debug!(probed = report.probed, "WebSocket heartbeat ping");
                    }
                }
            }
        }
    })
}
