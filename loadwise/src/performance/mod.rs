//! Network and device performance sampling.
//!
//! The sampler reads host introspection through the [`HostProbe`] trait,
//! normalizes it into a [`PerformanceSnapshot`] and serves that snapshot from
//! a short-lived cache. Sampling never fails: anything the host cannot report
//! (or reports with an error) is replaced by documented defaults, so
//! performance awareness degrades gracefully instead of breaking `start`.
//!
//! # Flow
//!
//! ```text
//! HostProbe::network() ─┐
//!                       ├──► PerformanceSnapshot ──► cache (TTL) ──► sample()
//! HostProbe::device()  ─┘          │
//!                                  └──► watch channel ──► subscribers
//! ```
//!
//! # Example
//!
//! ```
//! use loadwise::performance::{LoadClass, PerformanceSampler, StaticProbe};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sampler = PerformanceSampler::new(Arc::new(StaticProbe::fast()), Duration::from_secs(30));
//! let snapshot = sampler.sample();
//! assert!(!snapshot.is_slow_network);
//!
//! let estimate = snapshot.estimate_load_time(512 * 1024, LoadClass::Image);
//! assert!(estimate >= Duration::from_millis(100));
//! ```

mod probe;
mod sampler;
mod snapshot;

pub use probe::{
    DeviceInfo, HostProbe, NetworkInfo, ProbeError, StaticProbe, SystemProbe, UnavailableProbe,
};
pub use sampler::PerformanceSampler;
pub use snapshot::{
    LoadClass, NetworkType, PerformanceSnapshot, DEFAULT_DEVICE_MEMORY_GB, DEFAULT_DOWNLINK_MBPS,
    DEFAULT_HARDWARE_CONCURRENCY, DEFAULT_RTT_MS, MAX_LOAD_ESTIMATE_MS, MIN_LOAD_ESTIMATE_MS,
};
