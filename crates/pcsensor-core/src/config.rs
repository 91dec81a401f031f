//! Persistent sensor selection and output settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::device::DeviceSelector;
use crate::report::OutputMode;

/// Configuration for a reading.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// USB bus number to search.
    pub bus: Option<u8>,
    /// USB device address on `bus`.
    pub device: Option<u8>,
    /// Print the bare value only.
    pub quiet: bool,
}

impl SensorConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SensorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector {
            bus: self.bus,
            device_address: self.device,
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.quiet {
            OutputMode::Bare
        } else {
            OutputMode::Labelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config: SensorConfig = toml::from_str("bus = 3\n").unwrap();
        assert_eq!(config.selector(), DeviceSelector::on_bus(3));
        assert_eq!(config.output_mode(), OutputMode::Labelled);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: SensorConfig = toml::from_str("").unwrap();
        assert_eq!(config, SensorConfig::default());
        assert_eq!(config.selector(), DeviceSelector::any());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "pcsensor-config-{}.toml",
            std::process::id()
        ));
        let config = SensorConfig {
            bus: Some(1),
            device: Some(0),
            quiet: true,
        };

        config.save_to_file(&path).unwrap();
        let loaded = SensorConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.selector(), DeviceSelector::at(1, 0));
        assert_eq!(loaded.output_mode(), OutputMode::Bare);
    }
}
