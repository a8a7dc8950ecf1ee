//! Cached performance sampler.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::probe::{DeviceInfo, HostProbe, NetworkInfo};
use super::snapshot::{LoadClass, PerformanceSnapshot};

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: PerformanceSnapshot,
    sampled_at: Instant,
}

/// Read-through cache in front of a [`HostProbe`].
///
/// `sample()` returns the cached snapshot until it is older than the TTL;
/// `force_sample()` always re-reads the host. Every fresh sample gets the
/// next version number and is published to subscribers.
///
/// Snapshots are values: operations that already bound a strategy keep it,
/// only the next `start` sees a fresher snapshot.
pub struct PerformanceSampler {
    probe: Arc<dyn HostProbe>,
    ttl: Duration,
    cache: Mutex<Option<CachedSnapshot>>,
    version: AtomicU64,
    updates: watch::Sender<PerformanceSnapshot>,
}

impl fmt::Debug for PerformanceSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceSampler")
            .field("ttl", &self.ttl)
            .field("cache", &self.cache)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl PerformanceSampler {
    /// Create a sampler over the given probe with the given cache TTL.
    pub fn new(probe: Arc<dyn HostProbe>, ttl: Duration) -> Self {
        let (updates, _) = watch::channel(PerformanceSnapshot::default());
        Self {
            probe,
            ttl,
            cache: Mutex::new(None),
            version: AtomicU64::new(0),
            updates,
        }
    }

    /// Cache time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot, re-sampling if it is missing or stale.
    pub fn sample(&self) -> PerformanceSnapshot {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.sampled_at.elapsed() < self.ttl {
                return cached.snapshot.clone();
            }
        }
        self.refresh(&mut cache)
    }

    /// Re-sample the host, bypassing the cache.
    pub fn force_sample(&self) -> PerformanceSnapshot {
        let mut cache = self.cache.lock();
        self.refresh(&mut cache)
    }

    /// Handle a host network-change event: re-sample and notify subscribers.
    pub fn notify_network_change(&self) -> PerformanceSnapshot {
        let snapshot = self.force_sample();
        info!(
            effective_type = %snapshot.effective_type,
            downlink = snapshot.downlink,
            rtt = snapshot.rtt,
            slow = snapshot.is_slow_network,
            version = snapshot.version,
            "Network change: performance snapshot refreshed"
        );
        snapshot
    }

    /// The most recent snapshot without touching the host (if any sample was taken).
    pub fn cached(&self) -> Option<PerformanceSnapshot> {
        self.cache.lock().as_ref().map(|c| c.snapshot.clone())
    }

    /// Subscribe to fresh snapshots.
    ///
    /// The receiver starts with the latest published value (the default
    /// snapshot before the first sample).
    pub fn subscribe(&self) -> watch::Receiver<PerformanceSnapshot> {
        self.updates.subscribe()
    }

    /// Estimate load time for a payload using the current snapshot.
    pub fn estimate_load_time(&self, size_bytes: u64, class: LoadClass) -> Duration {
        self.sample().estimate_load_time(size_bytes, class)
    }

    fn refresh(&self, cache: &mut Option<CachedSnapshot>) -> PerformanceSnapshot {
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let (network, device) = (self.read_network(), self.read_device());
        let snapshot = PerformanceSnapshot::from_host(network, device, version);

        debug!(
            version,
            downlink = snapshot.downlink,
            rtt = snapshot.rtt,
            memory_gb = snapshot.device_memory,
            cores = snapshot.hardware_concurrency,
            low_end = snapshot.is_low_end_device,
            slow = snapshot.is_slow_network,
            "Performance sampled"
        );

        *cache = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            sampled_at: Instant::now(),
        });
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    fn read_network(&self) -> Option<NetworkInfo> {
        match self.probe.network() {
            Ok(info) => {
                if info.is_none() {
                    debug!("Network information unavailable, using defaults");
                }
                info
            }
            Err(e) => {
                warn!(error = %e, "Network sampling failed, using defaults");
                None
            }
        }
    }

    fn read_device(&self) -> Option<DeviceInfo> {
        match self.probe.device() {
            Ok(info) => {
                if info.is_none() {
                    debug!("Device information unavailable, using defaults");
                }
                info
            }
            Err(e) => {
                warn!(error = %e, "Device sampling failed, using defaults");
                None
            }
        }
    }
}
