//! agecache stats monitor
//!
//! Builds a cache from the environment, probes it on a fixed period and
//! logs the statistics accumulated since the previous report.

use std::env;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agecache::{Cache, Config};

/// Default report period when `AGECACHE_REPORT_INTERVAL_MS` is unset.
const DEFAULT_REPORT_INTERVAL_MS: u64 = 100;

/// Main entry point for the stats monitor.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (spawning the reaper for active expiration)
/// 4. Probe the cache and report stats deltas until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting agecache stats monitor");

    let config = Config::from_env();
    let report_interval = env::var("AGECACHE_REPORT_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_REPORT_INTERVAL_MS));
    info!(
        "Configuration loaded: capacity={}, max_age={:?}, min_age={:?}, expiration={:?}, report_interval={:?}",
        config.capacity,
        config.max_age,
        config.min_age,
        config.expiration_type,
        report_interval
    );

    let cache: Cache<String, String> = Cache::builder(config.capacity)
        .max_age(config.max_age)
        .min_age(config.min_age)
        .expiration_type(config.expiration_type)
        .expiration_interval(config.expiration_interval)
        .on_eviction(|key: &String, _: &String| debug!("Evicted {}", key))
        .on_expiration(|key: &String, _: &String| debug!("Expired {}", key))
        .build()
        .context("invalid cache configuration")?;

    cache.set("a".to_string(), "1".to_string());
    let mut previous = cache.stats();
    let mut ticker = tokio::time::interval(report_interval);
    // First tick completes immediately
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        cache.get("a"); // hit
        cache.get("b"); // miss
        cache.get("a"); // hit

        let current = cache.stats();
        let delta = current.delta(&previous);
        info!(
            "hits={} misses={} hit_rate={:.2} stats={}",
            delta.hits,
            delta.misses,
            delta.hit_rate(),
            serde_json::to_string(&delta)?
        );
        previous = current;
    }

    cache.close();
    info!("Stats monitor shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
