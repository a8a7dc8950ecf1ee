//! Host introspection boundary.
//!
//! The [`HostProbe`] trait is the only way the sampler learns about the
//! network and the device. Both queries are optional: `Ok(None)` means the
//! host has no such facility, `Err` means the query failed. The sampler treats
//! both the same way (defaults) but logs errors.
//!
//! # Implementors
//!
//! - [`SystemProbe`] - reads the local machine (Linux `/proc/meminfo`, core count)
//! - [`StaticProbe`] - fixed, swappable values for tests and what-if runs
//! - [`UnavailableProbe`] - reports nothing; every snapshot uses defaults

use parking_lot::Mutex;
use thiserror::Error;

use super::snapshot::NetworkType;

/// Errors reported by host introspection.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Reading a host source failed.
    #[error("I/O error while probing host: {0}")]
    Io(#[from] std::io::Error),

    /// The host source was readable but not in the expected format.
    #[error("Malformed host data: {0}")]
    Malformed(String),
}

/// Network information reported by the host. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkInfo {
    /// Connection type.
    pub network_type: Option<NetworkType>,
    /// Effective connection type; defaults to `network_type`.
    pub effective_type: Option<NetworkType>,
    /// Downlink in Mbps.
    pub downlink: Option<f64>,
    /// Round-trip time in milliseconds.
    pub rtt: Option<u32>,
}

impl NetworkInfo {
    /// Network info with every field reported.
    pub fn new(effective_type: NetworkType, downlink: f64, rtt: u32) -> Self {
        Self {
            network_type: Some(effective_type),
            effective_type: Some(effective_type),
            downlink: Some(downlink),
            rtt: Some(rtt),
        }
    }
}

/// Device information reported by the host. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceInfo {
    /// Memory in GB.
    pub memory_gb: Option<f64>,
    /// Logical core count.
    pub cores: Option<u32>,
}

impl DeviceInfo {
    /// Device info with every field reported.
    pub fn new(memory_gb: f64, cores: u32) -> Self {
        Self {
            memory_gb: Some(memory_gb),
            cores: Some(cores),
        }
    }
}

/// Source of network and device measurements.
///
/// Implementations must be cheap to call; the sampler caches results but
/// `force_sample` and network-change events bypass the cache.
pub trait HostProbe: Send + Sync {
    /// Query network information.
    fn network(&self) -> Result<Option<NetworkInfo>, ProbeError>;

    /// Query device information.
    fn device(&self) -> Result<Option<DeviceInfo>, ProbeError>;
}

/// Probe that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProbe;

impl HostProbe for UnavailableProbe {
    fn network(&self) -> Result<Option<NetworkInfo>, ProbeError> {
        Ok(None)
    }

    fn device(&self) -> Result<Option<DeviceInfo>, ProbeError> {
        Ok(None)
    }
}

/// Probe with fixed values that can be replaced at runtime.
///
/// Replacing the network info and then calling
/// `PerformanceSampler::notify_network_change` simulates a host network
/// change.
#[derive(Debug, Default)]
pub struct StaticProbe {
    network: Mutex<Option<NetworkInfo>>,
    device: Mutex<Option<DeviceInfo>>,
}

impl StaticProbe {
    /// Create a probe reporting the given values.
    pub fn new(network: Option<NetworkInfo>, device: Option<DeviceInfo>) -> Self {
        Self {
            network: Mutex::new(network),
            device: Mutex::new(device),
        }
    }

    /// A fast desktop: 4g, 10 Mbps, 50 ms, 8 GB, 8 cores.
    pub fn fast() -> Self {
        Self::new(
            Some(NetworkInfo::new(NetworkType::G4, 10.0, 50)),
            Some(DeviceInfo::new(8.0, 8)),
        )
    }

    /// A slow connection on a capable device: 2g, 0.5 Mbps, 400 ms.
    pub fn slow_network() -> Self {
        Self::new(
            Some(NetworkInfo::new(NetworkType::G2, 0.5, 400)),
            Some(DeviceInfo::new(8.0, 8)),
        )
    }

    /// Replace the reported network info.
    pub fn set_network(&self, network: Option<NetworkInfo>) {
        *self.network.lock() = network;
    }

    /// Replace the reported device info.
    pub fn set_device(&self, device: Option<DeviceInfo>) {
        *self.device.lock() = device;
    }
}

impl HostProbe for StaticProbe {
    fn network(&self) -> Result<Option<NetworkInfo>, ProbeError> {
        Ok(*self.network.lock())
    }

    fn device(&self) -> Result<Option<DeviceInfo>, ProbeError> {
        Ok(*self.device.lock())
    }
}

/// Probe for the local machine.
///
/// Device memory comes from `/proc/meminfo` on Linux and core count from
/// `std::thread::available_parallelism`. A process has no portable view of
/// link quality, so network info is reported as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    /// Create a system probe.
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "linux")]
    fn memory_gb() -> Result<Option<f64>, ProbeError> {
        let meminfo = std::fs::read_to_string("/proc/meminfo")?;
        parse_meminfo_total_gb(&meminfo).map(Some)
    }

    #[cfg(not(target_os = "linux"))]
    fn memory_gb() -> Result<Option<f64>, ProbeError> {
        Ok(None)
    }
}

impl HostProbe for SystemProbe {
    fn network(&self) -> Result<Option<NetworkInfo>, ProbeError> {
        Ok(None)
    }

    fn device(&self) -> Result<Option<DeviceInfo>, ProbeError> {
        let memory_gb = Self::memory_gb()?;
        let cores = std::thread::available_parallelism()
            .ok()
            .map(|n| n.get() as u32);

        if memory_gb.is_none() && cores.is_none() {
            return Ok(None);
        }
        Ok(Some(DeviceInfo { memory_gb, cores }))
    }
}

/// Extract `MemTotal` (kB) from `/proc/meminfo` text as GB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo_total_gb(meminfo: &str) -> Result<f64, ProbeError> {
    let line = meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .ok_or_else(|| ProbeError::Malformed("MemTotal not found".to_string()))?;

    let kb: u64 = line
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ProbeError::Malformed(format!("unparsable: {line}")))?;

    Ok(kb as f64 / (1024.0 * 1024.0))
}
