//! Atomic gateway statistics counters.
//!
//! Lock-free counters for tracking traffic volume. All atomics use `Relaxed`
//! ordering — these are monotonic display counters with no synchronization
//! requirements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

struct StatsInner {
    telegram_updates: AtomicU64,
    messages_sent: AtomicU64,
    files_sent: AtomicU64,
    proxy_requests: AtomicU64,
    proxy_failures: AtomicU64,
    relayed_bytes: AtomicU64,
}

/// Thread-safe atomic gateway statistics. Cheap to clone (Arc).
#[derive(Clone)]
pub struct GatewayStats {
    inner: Arc<StatsInner>,
}

/// Snapshot of current stats values, serializable to JSON.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub telegram_updates: u64,
    pub messages_sent: u64,
    pub files_sent: u64,
    pub proxy_requests: u64,
    pub proxy_failures: u64,
    pub relayed_bytes: u64,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                telegram_updates: AtomicU64::new(0),
                messages_sent: AtomicU64::new(0),
                files_sent: AtomicU64::new(0),
                proxy_requests: AtomicU64::new(0),
                proxy_failures: AtomicU64::new(0),
                relayed_bytes: AtomicU64::new(0),
            }),
        }
    }

    pub fn inc_telegram_updates(&self) {
        self.inner.telegram_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_messages_sent(&self) {
        self.inner.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_files_sent(&self) {
        self.inner.files_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_proxy_requests(&self) {
        self.inner.proxy_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_proxy_failures(&self) {
        self.inner.proxy_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_relayed_bytes(&self, n: u64) {
        self.inner.relayed_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            telegram_updates: self.inner.telegram_updates.load(Ordering::Relaxed),
            messages_sent: self.inner.messages_sent.load(Ordering::Relaxed),
            files_sent: self.inner.files_sent.load(Ordering::Relaxed),
            proxy_requests: self.inner.proxy_requests.load(Ordering::Relaxed),
            proxy_failures: self.inner.proxy_failures.load(Ordering::Relaxed),
            relayed_bytes: self.inner.relayed_bytes.load(Ordering::Relaxed),
        }
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_clones() {
        let stats = GatewayStats::new();
        let clone = stats.clone();

        stats.inc_proxy_requests();
        clone.inc_proxy_requests();
        clone.add_relayed_bytes(1024);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.proxy_requests, 2);
        assert_eq!(snapshot.relayed_bytes, 1024);
        assert_eq!(snapshot.messages_sent, 0);
    }
}
