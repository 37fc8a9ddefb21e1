//! Analog port tests on a paused tokio clock.

mod common;

use common::{device_with, A00, A01};
use periph_hal::ports::AnalogPortOptions;
use periph_hal::{HalConfig, PortError, Voltage};
use periph_hal::native::NativeOpcode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn config() -> HalConfig {
    let mut config = HalConfig::default();
    config.analog.max_raw_value = 3300;
    config.analog.reference_voltage = 3.3;
    config
}

fn assert_volts(actual: Voltage, expected: f64) {
    assert!(
        (actual.volts() - expected).abs() < 1e-9,
        "expected {expected} V, got {actual}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_read_averages_samples() {
    let (device, mock) = device_with(config());
    mock.push_adc_values(A00, [1000, 1200, 800, 1000, 1000]);
    let port = device.create_analog_input_port("A00", None).unwrap();

    let voltage = port.read().await.unwrap();
    assert_volts(voltage, 1.0);
    // One-shot reads leave the buffer alone.
    assert!(port.sample_buffer().is_empty());
    assert_eq!(port.voltage(), None);
}

#[tokio::test(start_paused = true)]
async fn test_sampling_publishes_batches() {
    let (device, mock) = device_with(config());
    mock.push_adc_values(A00, [1000, 1200, 800, 1000, 1000]);
    mock.push_adc_values(A00, [2000; 5]);
    let port = device.create_analog_input_port("A00", None).unwrap();
    let mut changes = port.subscribe();

    port.start_sampling(Some(Duration::from_millis(500))).unwrap();
    assert!(port.is_sampling());
    assert_eq!(port.update_interval(), Duration::from_millis(500));

    let first = changes.recv().await.unwrap();
    assert_volts(first.new, 1.0);
    assert_eq!(first.old, None);
    assert_eq!(port.sample_buffer().len(), 5);

    let second = changes.recv().await.unwrap();
    assert_volts(second.new, 2.0);
    assert_eq!(second.old, Some(first.new));
    assert_volts(port.voltage().unwrap(), 2.0);

    port.stop_sampling().await;
    assert!(!port.is_sampling());
}

#[tokio::test(start_paused = true)]
async fn test_no_notification_after_stop() {
    let (device, mock) = device_with(config());
    mock.push_adc_values(A01, [1650]);
    let port = device.create_analog_input_port("A01", None).unwrap();
    let mut changes = port.subscribe();

    port.start_sampling(None).unwrap();
    changes.recv().await.unwrap();
    port.stop_sampling().await;
    while changes.try_recv().is_ok() {}

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_start_and_stop_are_idempotent() {
    let (device, _mock) = device_with(config());
    let port = device.create_analog_input_port("A00", None).unwrap();

    port.stop_sampling().await;
    port.start_sampling(None).unwrap();
    port.start_sampling(None).unwrap();
    assert!(port.is_sampling());
    port.stop_sampling().await;
    port.stop_sampling().await;
    assert!(!port.is_sampling());

    port.start_sampling(None).unwrap();
    assert!(port.is_sampling());
}

#[tokio::test(start_paused = true)]
async fn test_custom_options() {
    let (device, mock) = device_with(config());
    mock.push_adc_values(A00, [3300]);
    let options = AnalogPortOptions {
        sample_count: 1,
        sample_interval: Duration::ZERO,
        update_interval: Duration::from_secs(2),
        reference: Voltage::from_volts(5.0),
    };
    let port = device.create_analog_input_port("A00", Some(options)).unwrap();
    assert_eq!(port.sample_count(), 1);
    assert_volts(port.read().await.unwrap(), 5.0);
}

/// Every analog port shares one converter, so conversions never overlap
/// even when two ports sample and read on different worker threads.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conversions_serialized_across_ports() {
    let (device, mock) = device_with(config());
    mock.push_adc_values(A00, [1000]);
    mock.push_adc_values(A01, [2000]);
    mock.set_call_delay(Duration::from_millis(2));
    let options = AnalogPortOptions {
        sample_count: 4,
        sample_interval: Duration::from_millis(1),
        update_interval: Duration::from_millis(5),
        reference: Voltage::from_volts(3.3),
    };
    let first = Arc::new(
        device
            .create_analog_input_port("A00", Some(options.clone()))
            .unwrap(),
    );
    let second = Arc::new(device.create_analog_input_port("A01", Some(options)).unwrap());

    first.start_sampling(None).unwrap();
    second.start_sampling(None).unwrap();
    let readers: Vec<_> = (0..8)
        .map(|i| {
            let port = if i % 2 == 0 {
                Arc::clone(&first)
            } else {
                Arc::clone(&second)
            };
            tokio::spawn(async move { port.read().await })
        })
        .collect();
    for reader in readers {
        reader.await.unwrap().unwrap();
    }
    first.stop_sampling().await;
    second.stop_sampling().await;

    let conversions = mock.commands_for(NativeOpcode::AdcRead);
    assert!(conversions.len() >= 32);
    assert!(conversions.iter().any(|c| c.target == A00));
    assert!(conversions.iter().any(|c| c.target == A01));
    assert_eq!(mock.max_concurrent_calls(), 1);
}

#[test]
fn test_zero_sample_count_rejected() {
    let (device, _mock) = device_with(config());
    let options = AnalogPortOptions {
        sample_count: 0,
        ..AnalogPortOptions::default()
    };
    let err = device
        .create_analog_input_port("A00", Some(options))
        .unwrap_err();
    assert!(matches!(
        err,
        periph_hal::HalError::Port(PortError::InvalidConfiguration(_))
    ));
    // Nothing was reserved.
    assert!(!device.arbiter().is_reserved("A00"));
}

#[test]
fn test_start_sampling_needs_runtime() {
    let (device, _mock) = device_with(config());
    let port = device.create_analog_input_port("A00", None).unwrap();
    assert!(matches!(
        port.start_sampling(None),
        Err(PortError::NoRuntime)
    ));
}

#[test]
fn test_analog_rejects_digital_only_pin() {
    let (device, _mock) = device_with(config());
    assert!(device.create_analog_input_port("D01", None).is_err());
}
