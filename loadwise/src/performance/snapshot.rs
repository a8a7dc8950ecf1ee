//! Normalized performance measurements.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::probe::{DeviceInfo, NetworkInfo};

// =============================================================================
// Defaults (used when the host cannot report a value)
// =============================================================================

/// Default downlink when the host cannot report one (1 Mbps).
pub const DEFAULT_DOWNLINK_MBPS: f64 = 1.0;

/// Default round-trip time when the host cannot report one (100 ms).
pub const DEFAULT_RTT_MS: u32 = 100;

/// Default device memory when the host cannot report it (2 GB).
pub const DEFAULT_DEVICE_MEMORY_GB: f64 = 2.0;

/// Default core count when the host cannot report it.
pub const DEFAULT_HARDWARE_CONCURRENCY: u32 = 2;

// =============================================================================
// Classification thresholds
// =============================================================================

/// Devices with this much memory (GB) or less are low-end.
pub const LOW_END_MEMORY_GB: f64 = 2.0;

/// Devices with this many cores or fewer are low-end.
pub const LOW_END_CORES: u32 = 2;

/// Downlink (Mbps) below which the network is slow.
pub const SLOW_DOWNLINK_MBPS: f64 = 1.0;

/// Round-trip time (ms) above which the network is slow.
pub const SLOW_RTT_MS: u32 = 300;

/// Downlink (Mbps) above which a non-slow network is fast.
pub const FAST_DOWNLINK_MBPS: f64 = 5.0;

// =============================================================================
// Load estimation bounds
// =============================================================================

/// Lower bound of a load-time estimate.
pub const MIN_LOAD_ESTIMATE_MS: f64 = 100.0;

/// Upper bound of a load-time estimate.
pub const MAX_LOAD_ESTIMATE_MS: f64 = 30_000.0;

/// Extra cost multiplier applied on low-end devices.
const LOW_END_DEVICE_MULTIPLIER: f64 = 1.5;

/// Connection class as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    G2,
    #[serde(rename = "3g")]
    G3,
    #[serde(rename = "4g")]
    G4,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl NetworkType {
    /// Host-facing name of this connection class.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Slow2g => "slow-2g",
            NetworkType::G2 => "2g",
            NetworkType::G3 => "3g",
            NetworkType::G4 => "4g",
            NetworkType::Unknown => "unknown",
        }
    }

    /// Whether this class alone marks the network as slow.
    pub fn is_slow(&self) -> bool {
        matches!(self, NetworkType::Slow2g | NetworkType::G2)
    }

    /// Parse a host-reported name; anything unrecognised is `Unknown`.
    pub fn parse_lossy(value: &str) -> Self {
        value.parse().unwrap_or(NetworkType::Unknown)
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(NetworkType::Slow2g),
            "2g" => Ok(NetworkType::G2),
            "3g" => Ok(NetworkType::G3),
            "4g" => Ok(NetworkType::G4),
            "unknown" => Ok(NetworkType::Unknown),
            other => Err(format!("unknown network type: {other}")),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of payload for load-time estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadClass {
    Api,
    Image,
    Component,
}

impl LoadClass {
    /// Relative cost of this payload class.
    pub fn multiplier(&self) -> f64 {
        match self {
            LoadClass::Api => 1.0,
            LoadClass::Image => 1.2,
            LoadClass::Component => 0.8,
        }
    }
}

impl FromStr for LoadClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(LoadClass::Api),
            "image" => Ok(LoadClass::Image),
            "component" => Ok(LoadClass::Component),
            other => Err(format!("unknown load class: {other}")),
        }
    }
}

/// Network and device capability at one point in time.
///
/// Built once per fresh sample and never mutated; `version` increases with
/// every fresh sample so consumers can tell which measurement a strategy was
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Reported connection type.
    pub network_type: NetworkType,
    /// Effective connection type (what the link behaves like).
    pub effective_type: NetworkType,
    /// Downlink bandwidth in Mbps.
    pub downlink: f64,
    /// Round-trip time in milliseconds.
    pub rtt: u32,
    /// Device memory in GB.
    pub device_memory: f64,
    /// Logical core count.
    pub hardware_concurrency: u32,
    /// Device is memory- or core-constrained.
    pub is_low_end_device: bool,
    /// Network is slow (by type, bandwidth or latency).
    pub is_slow_network: bool,
    /// Sample sequence number (0 for snapshots built outside a sampler).
    pub version: u64,
}

impl Default for PerformanceSnapshot {
    fn default() -> Self {
        Self::from_host(None, None, 0)
    }
}

impl PerformanceSnapshot {
    /// Build a snapshot from whatever the host reported.
    ///
    /// Missing or nonsensical values (negative, non-finite, zero cores) fall
    /// back to the `DEFAULT_*` constants. Only reported device figures can
    /// mark the device as low-end; the defaults never do.
    pub fn from_host(
        network: Option<NetworkInfo>,
        device: Option<DeviceInfo>,
        version: u64,
    ) -> Self {
        let network = network.unwrap_or_default();
        let device = device.unwrap_or_default();

        let network_type = network.network_type.unwrap_or_default();
        let effective_type = network.effective_type.unwrap_or(network_type);
        let downlink = network
            .downlink
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(DEFAULT_DOWNLINK_MBPS);
        let rtt = network.rtt.unwrap_or(DEFAULT_RTT_MS);
        let reported_memory = device.memory_gb.filter(|m| m.is_finite() && *m > 0.0);
        let reported_cores = device.cores.filter(|c| *c > 0);

        let is_low_end_device = reported_memory.is_some_and(|m| m <= LOW_END_MEMORY_GB)
            || reported_cores.is_some_and(|c| c <= LOW_END_CORES);

        Self {
            is_low_end_device,
            ..Self::with_values(
                network_type,
                effective_type,
                downlink,
                rtt,
                reported_memory.unwrap_or(DEFAULT_DEVICE_MEMORY_GB),
                reported_cores.unwrap_or(DEFAULT_HARDWARE_CONCURRENCY),
                version,
            )
        }
    }

    /// Build a snapshot from explicit values, deriving the flags.
    pub fn with_values(
        network_type: NetworkType,
        effective_type: NetworkType,
        downlink: f64,
        rtt: u32,
        device_memory: f64,
        hardware_concurrency: u32,
        version: u64,
    ) -> Self {
        let is_low_end_device =
            device_memory <= LOW_END_MEMORY_GB || hardware_concurrency <= LOW_END_CORES;
        let is_slow_network =
            effective_type.is_slow() || downlink < SLOW_DOWNLINK_MBPS || rtt > SLOW_RTT_MS;

        Self {
            network_type,
            effective_type,
            downlink,
            rtt,
            device_memory,
            hardware_concurrency,
            is_low_end_device,
            is_slow_network,
            version,
        }
    }

    /// Whether the network counts as fast (not slow, downlink above 5 Mbps).
    pub fn is_fast_network(&self) -> bool {
        !self.is_slow_network && self.downlink > FAST_DOWNLINK_MBPS
    }

    /// Estimate how long loading `size_bytes` of the given class will take.
    ///
    /// `(transfer + 2 * rtt) * device * class`, clamped to `[100ms, 30s]`,
    /// where `transfer = size_bytes / 1024 / downlink * 1000`.
    pub fn estimate_load_time(&self, size_bytes: u64, class: LoadClass) -> Duration {
        let transfer_ms = size_bytes as f64 / 1024.0 / self.downlink * 1000.0;
        let device_multiplier = if self.is_low_end_device {
            LOW_END_DEVICE_MULTIPLIER
        } else {
            1.0
        };
        let total_ms =
            (transfer_ms + 2.0 * self.rtt as f64) * device_multiplier * class.multiplier();
        let clamped = if total_ms.is_nan() {
            MAX_LOAD_ESTIMATE_MS
        } else {
            total_ms.clamp(MIN_LOAD_ESTIMATE_MS, MAX_LOAD_ESTIMATE_MS)
        };
        Duration::from_millis(clamped.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop(downlink: f64, rtt: u32) -> PerformanceSnapshot {
        PerformanceSnapshot::with_values(NetworkType::G4, NetworkType::G4, downlink, rtt, 8.0, 8, 1)
    }

    #[test]
    fn test_default_snapshot_uses_documented_values() {
        let snapshot = PerformanceSnapshot::default();
        assert_eq!(snapshot.downlink, DEFAULT_DOWNLINK_MBPS);
        assert_eq!(snapshot.rtt, DEFAULT_RTT_MS);
        assert_eq!(snapshot.device_memory, DEFAULT_DEVICE_MEMORY_GB);
        assert_eq!(snapshot.hardware_concurrency, DEFAULT_HARDWARE_CONCURRENCY);
        assert_eq!(snapshot.network_type, NetworkType::Unknown);
        assert!(!snapshot.is_low_end_device);
        assert!(!snapshot.is_slow_network);
    }

    fn low_end(device: DeviceInfo) -> bool {
        PerformanceSnapshot::from_host(None, Some(device), 1).is_low_end_device
    }

    #[test]
    fn test_low_end_only_from_reported_figures() {
        let small = DeviceInfo {
            memory_gb: Some(2.0),
            cores: None,
        };
        assert!(low_end(small));

        let few_cores = DeviceInfo {
            memory_gb: None,
            cores: Some(2),
        };
        assert!(low_end(few_cores));

        let garbage = DeviceInfo {
            memory_gb: Some(f64::NAN),
            cores: Some(0),
        };
        assert!(!low_end(garbage));

        let capable = DeviceInfo {
            memory_gb: Some(8.0),
            cores: None,
        };
        assert!(!low_end(capable));
    }

    #[test]
    fn test_slow_network_detection() {
        assert!(desktop(0.5, 50).is_slow_network);
        assert!(desktop(10.0, 400).is_slow_network);
        assert!(!desktop(10.0, 50).is_slow_network);

        let two_g =
            PerformanceSnapshot::with_values(NetworkType::G4, NetworkType::G2, 10.0, 50, 8.0, 8, 1);
        assert!(two_g.is_slow_network);
    }

    #[test]
    fn test_fast_network_requires_not_slow() {
        assert!(desktop(10.0, 50).is_fast_network());
        assert!(!desktop(10.0, 400).is_fast_network());
        assert!(!desktop(5.0, 50).is_fast_network());
    }

    #[test]
    fn test_from_host_sanitizes_values() {
        let network = NetworkInfo {
            downlink: Some(f64::NAN),
            rtt: Some(80),
            ..Default::default()
        };
        let device = DeviceInfo {
            memory_gb: Some(-1.0),
            cores: Some(0),
        };
        let snapshot = PerformanceSnapshot::from_host(Some(network), Some(device), 3);
        assert_eq!(snapshot.downlink, DEFAULT_DOWNLINK_MBPS);
        assert_eq!(snapshot.rtt, 80);
        assert_eq!(snapshot.device_memory, DEFAULT_DEVICE_MEMORY_GB);
        assert_eq!(snapshot.hardware_concurrency, DEFAULT_HARDWARE_CONCURRENCY);
        assert!(!snapshot.is_low_end_device);
        assert_eq!(snapshot.version, 3);
    }

    #[test]
    fn test_effective_type_falls_back_to_network_type() {
        let network = NetworkInfo {
            network_type: Some(NetworkType::G3),
            ..Default::default()
        };
        let snapshot = PerformanceSnapshot::from_host(Some(network), None, 1);
        assert_eq!(snapshot.effective_type, NetworkType::G3);
    }

    #[test]
    fn test_estimate_load_time_formula() {
        // 1 MB at 10 Mbps: 1024 / 10 * 1000 = 102400ms transfer -> clamped
        assert_eq!(
            desktop(10.0, 50).estimate_load_time(1024 * 1024, LoadClass::Api),
            Duration::from_millis(30_000)
        );

        // 10 KB at 10 Mbps: 1000ms + 100ms rtt = 1100ms, image x1.2 = 1320ms
        assert_eq!(
            desktop(10.0, 50).estimate_load_time(10 * 1024, LoadClass::Image),
            Duration::from_millis(1320)
        );

        // Low-end device multiplies by 1.5: (1000 + 100) * 1.5 * 0.8 = 1320ms
        let low_end =
            PerformanceSnapshot::with_values(NetworkType::G4, NetworkType::G4, 10.0, 50, 1.0, 2, 1);
        assert_eq!(
            low_end.estimate_load_time(10 * 1024, LoadClass::Component),
            Duration::from_millis(1320)
        );
    }

    #[test]
    fn test_estimate_load_time_lower_bound() {
        assert_eq!(
            desktop(100.0, 1).estimate_load_time(0, LoadClass::Api),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_network_type_parsing() {
        assert_eq!(
            "slow-2g".parse::<NetworkType>().unwrap(),
            NetworkType::Slow2g
        );
        assert_eq!("4G".parse::<NetworkType>().unwrap(), NetworkType::G4);
        assert!("5g".parse::<NetworkType>().is_err());
        assert_eq!(NetworkType::parse_lossy("wifi"), NetworkType::Unknown);
        assert_eq!(NetworkType::Slow2g.to_string(), "slow-2g");
    }

    #[test]
    fn test_load_class_parsing() {
        assert_eq!("image".parse::<LoadClass>().unwrap(), LoadClass::Image);
        assert!("video".parse::<LoadClass>().is_err());
    }
}
