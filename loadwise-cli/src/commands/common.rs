//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use loadwise::{
    DeviceInfo, HostProbe, NetworkInfo, NetworkType, OrchestratorConfig, StaticProbe, SystemProbe,
};

use crate::error::CliError;

/// Host figures for what-if runs. Any figure given replaces live sampling.
#[derive(Debug, Clone, Default, Args)]
pub struct HostArgs {
    /// Effective connection type (slow-2g, 2g, 3g, 4g)
    #[arg(long, value_name = "TYPE")]
    pub network: Option<String>,

    /// Downlink bandwidth in Mbps
    #[arg(long, value_name = "MBPS")]
    pub downlink: Option<f64>,

    /// Round-trip time in milliseconds
    #[arg(long, value_name = "MS")]
    pub rtt: Option<u32>,

    /// Device memory in GB
    #[arg(long, value_name = "GB")]
    pub memory: Option<f64>,

    /// Logical core count
    #[arg(long, value_name = "N")]
    pub cores: Option<u32>,
}

impl HostArgs {
    fn network_info(&self) -> Option<NetworkInfo> {
        if self.network.is_none() && self.downlink.is_none() && self.rtt.is_none() {
            return None;
        }
        let effective_type = self.network.as_deref().map(NetworkType::parse_lossy);
        Some(NetworkInfo {
            network_type: effective_type,
            effective_type,
            downlink: self.downlink,
            rtt: self.rtt,
        })
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        if self.memory.is_none() && self.cores.is_none() {
            return None;
        }
        Some(DeviceInfo {
            memory_gb: self.memory,
            cores: self.cores,
        })
    }

    /// Whether any host figure was given.
    pub fn is_overridden(&self) -> bool {
        self.network_info().is_some() || self.device_info().is_some()
    }

    /// A fixed probe when figures were given, the live system probe otherwise.
    pub fn probe(&self) -> Arc<dyn HostProbe> {
        if self.is_overridden() {
            Arc::new(StaticProbe::new(self.network_info(), self.device_info()))
        } else {
            Arc::new(SystemProbe::new())
        }
    }
}

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig, CliError> {
    let config = match path {
        Some(path) => OrchestratorConfig::load(path)?,
        None => OrchestratorConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_no_figures_uses_system_probe() {
        let args = HostArgs::default();
        assert!(!args.is_overridden());
    }

    #[test]
    fn test_partial_network_figures() {
        let args = HostArgs {
            downlink: Some(0.4),
            ..HostArgs::default()
        };
        let probe = args.probe();
        let network = probe.network().unwrap().unwrap();
        assert_eq!(network.downlink, Some(0.4));
        assert_eq!(network.rtt, None);
        assert!(probe.device().unwrap().is_none());
    }

    #[test]
    fn test_network_type_is_parsed() {
        let args = HostArgs {
            network: Some("2g".to_string()),
            ..HostArgs::default()
        };
        let network = args.probe().network().unwrap().unwrap();
        assert_eq!(network.effective_type, Some(NetworkType::G2));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[orchestrator]\nauto_cleanup = false").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(!config.auto_cleanup);
        assert!(load_config(None).unwrap().auto_cleanup);
    }
}
