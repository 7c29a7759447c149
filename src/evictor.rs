use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EvictionConfig;
use crate::metrics::{EVICTED_TOTAL, LIMITER_CLIENTS};
use crate::registry::ClientRegistry;

// Eviction loop - drops idle clients every sweep interval until shutdown
pub async fn evictor(
    registry: Arc<ClientRegistry>,
    config: EvictionConfig,
    shutdown: CancellationToken,
) {
    // first sweep happens one full interval after start
    let mut ticker = interval_at(Instant::now() + config.sweep_interval, config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        sweep_interval = ?config.sweep_interval,
        max_idle = ?config.max_idle,
        "rate limiter evictor started"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = registry.evict_stale(config.max_idle);
                let tracked = registry.len();

                EVICTED_TOTAL.inc_by(removed as u64);
                LIMITER_CLIENTS.set(tracked as i64);

                if removed > 0 {
                    info!(removed, tracked, "evicted idle rate limiter clients");
                } else {
                    debug!(tracked, "eviction sweep found no idle clients");
                }
            }
        }
    }

    info!("rate limiter evictor stopped");
}

pub fn spawn_evictor(
    registry: Arc<ClientRegistry>,
    config: EvictionConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(evictor(registry, config, shutdown))
}
