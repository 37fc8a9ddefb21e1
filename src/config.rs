//! # HAL Configuration
//!
//! Settings for the analog sampler, the two buses and the WiFi coprocessor,
//! loaded from JSON. Every field has a default, so a partial document (or
//! `{}`) is a valid configuration.
//!
//! ```rust
//! use periph_hal::config::HalConfig;
//!
//! let config = HalConfig::from_json_str(r#"{ "analog": { "sample_count": 8 } }"#).unwrap();
//! assert_eq!(config.analog.sample_count, 8);
//! assert_eq!(config.i2c.default_frequency_hz, 100_000);
//! ```

use crate::constants::*;
use crate::units::Voltage;
use crate::util::hex::parse_mac_address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Analog sampling defaults applied to new analog ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogConfig {
    /// Samples per batch and per one-shot read
    pub sample_count: usize,
    pub sample_interval_ms: u64,
    pub update_interval_ms: u64,
    /// Converter reference in volts
    pub reference_voltage: f64,
    pub max_raw_value: u32,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            sample_count: ANALOG_DEFAULT_SAMPLE_COUNT,
            sample_interval_ms: ANALOG_DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
            update_interval_ms: ANALOG_DEFAULT_UPDATE_INTERVAL.as_millis() as u64,
            reference_voltage: ANALOG_DEFAULT_REFERENCE_VOLTAGE,
            max_raw_value: ADC_MAX_RAW_VALUE,
        }
    }
}

impl AnalogConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn reference(&self) -> Voltage {
        Voltage::from_volts(self.reference_voltage)
    }
}

/// Two-wire bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cConfig {
    pub default_frequency_hz: u32,
    pub supported_frequencies_hz: Vec<u32>,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            default_frequency_hz: I2C_STANDARD_HZ,
            supported_frequencies_hz: I2C_SUPPORTED_SPEEDS.to_vec(),
        }
    }
}

/// Four-wire bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    pub default_frequency_hz: u32,
    pub supported_frequencies_hz: Vec<u32>,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            default_frequency_hz: SPI_DEFAULT_SPEED_HZ,
            supported_frequencies_hz: SPI_SUPPORTED_SPEEDS.to_vec(),
        }
    }
}

/// WiFi coprocessor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiFiConfig {
    pub auto_connect: bool,
    pub auto_reconnect: bool,
    pub default_ssid: Option<String>,
    /// Raised to the minimum of 3 by the adapter
    pub maximum_retry_count: u32,
    pub scan_period_ms: u64,
    pub connect_poll_interval_ms: u64,
    /// Station MAC, e.g. `24:0A:C4:00:01:10`
    pub mac_address: Option<String>,
    pub soft_ap_mac_address: Option<String>,
}

impl Default for WiFiConfig {
    fn default() -> Self {
        Self {
            auto_connect: false,
            auto_reconnect: true,
            default_ssid: None,
            maximum_retry_count: 7,
            scan_period_ms: DEFAULT_SCAN_PERIOD.as_millis() as u64,
            connect_poll_interval_ms: CONNECT_POLL_INTERVAL.as_millis() as u64,
            mac_address: None,
            soft_ap_mac_address: None,
        }
    }
}

impl WiFiConfig {
    pub fn scan_period(&self) -> Duration {
        Duration::from_millis(self.scan_period_ms)
    }

    pub fn connect_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connect_poll_interval_ms)
    }
}

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    pub analog: AnalogConfig,
    pub i2c: I2cConfig,
    pub spi: SpiConfig,
    pub wifi: WiFiConfig,
}

impl HalConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: HalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analog.sample_count == 0 {
            return Err(ConfigError::Invalid(
                "analog.sample_count must be at least 1".to_string(),
            ));
        }
        if !(self.analog.reference_voltage > 0.0) {
            return Err(ConfigError::Invalid(
                "analog.reference_voltage must be positive".to_string(),
            ));
        }
        if self.analog.max_raw_value == 0 {
            return Err(ConfigError::Invalid(
                "analog.max_raw_value must be positive".to_string(),
            ));
        }
        if self.i2c.supported_frequencies_hz.is_empty() {
            return Err(ConfigError::Invalid(
                "i2c.supported_frequencies_hz must not be empty".to_string(),
            ));
        }
        if self.spi.supported_frequencies_hz.is_empty() {
            return Err(ConfigError::Invalid(
                "spi.supported_frequencies_hz must not be empty".to_string(),
            ));
        }

        let scan = self.wifi.scan_period();
        if scan < MINIMUM_SCAN_PERIOD || scan > MAXIMUM_SCAN_PERIOD {
            return Err(ConfigError::Invalid(format!(
                "wifi.scan_period_ms must be between {} and {}, got {}",
                MINIMUM_SCAN_PERIOD.as_millis(),
                MAXIMUM_SCAN_PERIOD.as_millis(),
                self.wifi.scan_period_ms
            )));
        }
        if self.wifi.connect_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "wifi.connect_poll_interval_ms must be positive".to_string(),
            ));
        }

        for (field, value) in [
            ("wifi.mac_address", &self.wifi.mac_address),
            ("wifi.soft_ap_mac_address", &self.wifi.soft_ap_mac_address),
        ] {
            if let Some(text) = value {
                parse_mac_address(text)
                    .map_err(|e| ConfigError::Invalid(format!("{field}: {e}")))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HalConfig::default();
        config.validate().unwrap();
        assert_eq!(config.analog.sample_count, 5);
        assert_eq!(config.analog.sample_interval(), Duration::from_millis(40));
        assert_eq!(config.wifi.scan_period(), Duration::from_secs(5));
        assert_eq!(config.spi.supported_frequencies_hz.len(), 8);
    }

    #[test]
    fn test_scan_period_bounds() {
        let mut config = HalConfig::default();
        config.wifi.scan_period_ms = 999;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.wifi.scan_period_ms = 60_000;
        assert!(config.validate().is_ok());
        config.wifi.scan_period_ms = 60_001;
        assert!(config.validate().is_err());
    }
}
