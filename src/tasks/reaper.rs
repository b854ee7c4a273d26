//! Active Reaper Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::Weak;
use std::thread;
use std::time::Duration;

use tokio::runtime::{self, Handle};
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::Inner;
use crate::error::{CacheError, Result};

/// Keys checked between cooperative yields during a sweep.
const SWEEP_BATCH: usize = 64;

/// Where the reaper loop is running.
#[derive(Debug)]
enum Worker {
    /// Task on a caller-supplied runtime
    Task(JoinHandle<()>),
    /// Dedicated thread driving its own single-threaded runtime
    Thread(thread::JoinHandle<()>),
}

/// Control handle for a running reaper.
#[derive(Debug)]
pub(crate) struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    worker: Worker,
}

impl ReaperHandle {
    /// Returns false once the loop has exited, including when its runtime
    /// was shut down underneath it.
    pub(crate) fn is_running(&self) -> bool {
        match &self.worker {
            Worker::Task(task) => !task.is_finished(),
            Worker::Thread(thread) => !thread.is_finished(),
        }
    }

    /// Signals the reaper to exit after its current key.
    pub(crate) fn stop(self) {
        // The loop may already be gone if the cache was dropped mid-sweep
        let _ = self.shutdown.send(true);
        if let Worker::Task(task) = &self.worker {
            task.abort();
        }
    }
}

/// Spawns the reaper, sweeping the cache for stale entries every `interval`.
///
/// With a `runtime` handle the loop is a task on that runtime and ends with
/// it. Without one it gets a named thread running a current-thread runtime,
/// so the cache keeps sweeping no matter which runtime (if any) built it.
///
/// # Errors
/// Returns `CacheError::ReaperSpawn` if the dedicated thread or its runtime
/// cannot be created.
pub(crate) fn spawn_reaper<K, V>(
    cache: Weak<Inner<K, V>>,
    interval: Duration,
    runtime: Option<Handle>,
) -> Result<ReaperHandle>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);
    let sweep_loop = run(cache, interval, shutdown_rx);

    let worker = match runtime {
        Some(handle) => Worker::Task(handle.spawn(sweep_loop)),
        None => {
            let rt = runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|err| CacheError::ReaperSpawn(err.to_string()))?;
            let thread = thread::Builder::new()
                .name("agecache-reaper".to_string())
                .spawn(move || rt.block_on(sweep_loop))
                .map_err(|err| CacheError::ReaperSpawn(err.to_string()))?;
            Worker::Thread(thread)
        }
    };

    Ok(ReaperHandle { shutdown, worker })
}

/// The sweep loop itself.
///
/// Each sweep snapshots the keys, then checks and removes them one at a
/// time so the write lock is never held for more than a single entry. It
/// yields to the runtime every `SWEEP_BATCH` keys. Only a weak reference is
/// held between sweeps; the loop exits once the cache is gone or stopped.
async fn run<K, V>(
    cache: Weak<Inner<K, V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    info!("Starting active reaper with interval of {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }

        let Some(inner) = cache.upgrade() else {
            break;
        };

        let mut removed = 0;
        for (checked, key) in inner.keys().into_iter().enumerate() {
            if checked > 0 && checked % SWEEP_BATCH == 0 {
                task::yield_now().await;
            }
            let stopping = *shutdown_rx.borrow();
            if stopping {
                break;
            }
            if inner.expire_if_stale(&key) {
                removed += 1;
            }
        }
        drop(inner);

        if removed > 0 {
            info!("Active reaper: removed {} expired entries", removed);
        } else {
            debug!("Active reaper: no expired entries found");
        }
    }

    info!("Active reaper stopped");
}
