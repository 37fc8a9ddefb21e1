//! Configuration loading tests.

use periph_hal::config::{ConfigError, HalConfig};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

#[test]
fn test_partial_document_uses_defaults() {
    let config = HalConfig::from_json_str(
        r#"{
            "i2c": { "default_frequency_hz": 400000 },
            "wifi": { "default_ssid": "lab", "scan_period_ms": 10000 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.i2c.default_frequency_hz, 400_000);
    assert_eq!(config.i2c.supported_frequencies_hz.len(), 3);
    assert_eq!(config.wifi.default_ssid.as_deref(), Some("lab"));
    assert_eq!(config.wifi.scan_period_ms, 10_000);
    assert_eq!(config.analog, HalConfig::default().analog);
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    let mut expected = HalConfig::default();
    expected.analog.sample_count = 16;
    expected.wifi.mac_address = Some("24-0A-C4-00-01-10".to_string());
    file.write_all(expected.to_json_string().unwrap().as_bytes())
        .unwrap();

    let loaded = assert_ok!(HalConfig::from_file(file.path()));
    assert_eq!(loaded, expected);
}

#[test]
fn test_missing_file() {
    let err = HalConfig::from_file("/nonexistent/periph.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().starts_with("Failed to read configuration"));
}

#[test]
fn test_malformed_json() {
    let err = HalConfig::from_json_str("{ \"analog\": ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_invalid_values() {
    let cases = [
        r#"{ "analog": { "sample_count": 0 } }"#,
        r#"{ "analog": { "reference_voltage": -1.0 } }"#,
        r#"{ "i2c": { "supported_frequencies_hz": [] } }"#,
        r#"{ "wifi": { "scan_period_ms": 61000 } }"#,
        r#"{ "wifi": { "connect_poll_interval_ms": 0 } }"#,
        r#"{ "wifi": { "mac_address": "24:0A" } }"#,
    ];
    for json in cases {
        let err = HalConfig::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid(_)),
            "{json} gave {err}"
        );
    }
}
