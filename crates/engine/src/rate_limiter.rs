//! Fixed-window request throttling per client identity.
//!
//! Each identity owns one [`RateWindow`] in a `DashMap`. `allow` does its
//! check-and-increment while holding the entry's shard lock, so two
//! concurrent calls for the same identity can never both see "under limit"
//! when only one slot remains.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    started: Instant,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    max_requests: u32,
    window: Duration,
    idle_evict: Duration,
    rejected: AtomicU64,
}

impl RateLimiter {
    /// Allow at most `max_requests` per `window` for each identity
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: max_requests.max(1),
            window,
            idle_evict: window * 10,
            rejected: AtomicU64::new(0),
        }
    }

    /// Forget identities idle for at least `idle` (never less than a window)
    pub fn with_idle_eviction(mut self, idle: Duration) -> Self {
        self.idle_evict = idle.max(self.window);
        self
    }

    /// Check and record a request for `identity`.
    ///
    /// Returns false once the identity has used its quota for the current
    /// window. A rejected call only bumps the rejection counter.
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();

        match self.windows.entry(identity.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(RateWindow {
                    count: 1,
                    started: now,
                    last_seen: now,
                });
                true
            }
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                window.last_seen = now;

                if now.duration_since(window.started) >= self.window {
                    window.count = 1;
                    window.started = now;
                    true
                } else if window.count < self.max_requests {
                    window.count += 1;
                    true
                } else {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    debug!(identity, count = window.count, "Rate limit reached");
                    false
                }
            }
        }
    }

    /// Time until `identity` may be admitted again, if it is currently
    /// over its quota
    pub fn retry_after(&self, identity: &str) -> Option<Duration> {
        let window = self.windows.get(identity)?;
        let elapsed = Instant::now().duration_since(window.started);
        if window.count >= self.max_requests && elapsed < self.window {
            Some(self.window - elapsed)
        } else {
            None
        }
    }

    /// Drop identities that are idle and whose window has expired.
    ///
    /// Only expired windows are removed, and an expired window behaves
    /// exactly like a missing one, so eviction never changes a decision.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            now.duration_since(window.last_seen) < self.idle_evict
                || now.duration_since(window.started) < self.window
        });
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            info!(evicted, remaining = self.windows.len(), "Evicted idle rate windows");
        }
        evicted
    }

    /// Run [`RateLimiter::evict_idle`] every `every` until the handle is aborted
    pub fn spawn_evictor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.evict_idle();
            }
        })
    }

    /// Start the evictor, sweeping once per rate window, tied to the
    /// returned guard. Returns `None` outside a tokio runtime.
    pub fn start_eviction(self: &Arc<Self>) -> Option<EvictorGuard> {
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("No runtime; idle rate windows will not be evicted");
            return None;
        }
        Some(EvictorGuard(self.spawn_evictor(self.window)))
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Total rejected calls since startup
    pub fn rejected_total(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Aborts the background eviction task when dropped
#[derive(Debug)]
pub struct EvictorGuard(JoinHandle<()>);

impl Drop for EvictorGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
