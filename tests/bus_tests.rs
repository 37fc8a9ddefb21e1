//! Bus transaction tests: serialization, clock clamping, native error
//! translation and chip-select handling.

mod common;

use common::device;
use periph_hal::bus::{clamp_frequency, BusError, ChipSelectMode, I2cPeripheral};
use periph_hal::constants::{
    I2C_FAST_HZ, I2C_FAST_PLUS_HZ, I2C_STANDARD_HZ, NATIVE_EAGAIN, NATIVE_ECANCELED,
    NATIVE_EHOSTDOWN, NATIVE_EIO, NATIVE_ESHUTDOWN, NATIVE_ETIMEDOUT,
};
use periph_hal::native::NativeOpcode;
use periph_hal::ports::OutputType;
use periph_hal::{SpiClockConfiguration, SpiMode};
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_i2c_read_write() {
    let (device, mock) = device();
    mock.queue_i2c_response(0x48, &[0xDE, 0xAD]);
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();

    bus.write(0x48, &[0x01, 0x02]).unwrap();
    let mut buffer = [0u8; 2];
    bus.read(0x48, &mut buffer).unwrap();
    assert_eq!(buffer, [0xDE, 0xAD]);

    let calls = mock.commands_for(NativeOpcode::I2cData);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].tx, vec![0x01, 0x02]);
    assert_eq!(calls[0].bus, 1);
    assert_eq!(calls[0].frequency_hz, I2C_STANDARD_HZ);
    assert_eq!(calls[1].rx_len, 2);
}

#[test]
fn test_peripheral_register_access() {
    let (device, mock) = device();
    mock.queue_i2c_response(0x76, &[0x01, 0x80]);
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();
    let sensor = I2cPeripheral::new(bus, 0x76);

    assert_eq!(sensor.read_u16_be(0xF7).unwrap(), 0x0180);
    let calls = mock.commands_for(NativeOpcode::I2cData);
    assert_eq!(calls[0].target, 0x76);
    assert_eq!(calls[0].tx, vec![0xF7]);
}

/// Transactions from many threads never overlap inside the driver.
#[test]
fn test_transactions_are_serialized() {
    let (device, mock) = device();
    mock.add_i2c_device(0x20);
    mock.set_call_delay(Duration::from_millis(2));
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let bus = Arc::clone(&bus);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..5 {
                    bus.write(0x20, &[i]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(mock.commands_for(NativeOpcode::I2cData).len(), 40);
    assert_eq!(mock.max_concurrent_calls(), 1);
}

#[test]
fn test_frequency_is_clamped() {
    let (device, _mock) = device();
    let bus = device.create_i2c_bus("D08", "D07", Some(500_000)).unwrap();
    assert_eq!(bus.frequency(), I2C_FAST_HZ);

    assert_eq!(bus.set_frequency(5_000_000), I2C_FAST_PLUS_HZ);
    assert_eq!(bus.set_frequency(10_000), I2C_STANDARD_HZ);
    assert_eq!(bus.set_frequency(I2C_FAST_HZ), I2C_FAST_HZ);
}

#[test]
fn test_spi_configuration_clamped() {
    let (device, _mock) = device();
    let bus = device
        .create_spi_bus(
            "SCK",
            "COPI",
            "CIPO",
            Some(SpiClockConfiguration::new(5_000_000, SpiMode::Mode3)),
        )
        .unwrap();
    let config = bus.configuration();
    assert_eq!(config.speed_hz, 3_000_000);
    assert_eq!(config.mode, SpiMode::Mode3);
}

#[test]
fn test_native_errors_are_translated() {
    let cases = [
        (NATIVE_ECANCELED, BusError::NoAcknowledge { address: 0x48 }),
        (NATIVE_ETIMEDOUT, BusError::LineDisconnected),
        (NATIVE_EHOSTDOWN, BusError::NoDevice { address: 0x48 }),
        (NATIVE_EAGAIN, BusError::Retry),
        (NATIVE_ESHUTDOWN, BusError::Shutdown),
        (NATIVE_EIO, BusError::Communication { code: NATIVE_EIO }),
    ];

    let (device, mock) = device();
    mock.add_i2c_device(0x48);
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();

    for (code, expected) in cases {
        mock.inject_error(NativeOpcode::I2cData, code);
        let mut buffer = [0u8; 1];
        assert_eq!(bus.read(0x48, &mut buffer), Err(expected));
    }
    // Injected errors are one-shot; the bus itself is still usable.
    bus.write(0x48, &[0]).unwrap();
}

#[test]
fn test_missing_device_and_bad_address() {
    let (device, _mock) = device();
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();

    let err = bus.write(0x10, &[0]).unwrap_err();
    assert_eq!(err, BusError::NoDevice { address: 0x10 });
    assert_eq!(err.to_string(), "No device found at address 0x10");
    assert_eq!(bus.write(0x80, &[0]), Err(BusError::InvalidAddress(0x80)));
}

#[test]
fn test_shutdown_rejects_later_transactions() {
    let (device, mock) = device();
    mock.add_i2c_device(0x48);
    let bus = device.create_i2c_bus("D08", "D07", None).unwrap();
    bus.shutdown().unwrap();
    assert_eq!(bus.write(0x48, &[1]), Err(BusError::Shutdown));
}

#[test]
fn test_bus_rejects_wrong_pins() {
    let (device, _mock) = device();
    let err = device.create_i2c_bus("D07", "D08", None).unwrap_err();
    assert!(err.to_string().contains("Invalid pin D07"));
}

#[test]
fn test_spi_chip_select_wraps_transfer() {
    let (device, mock) = device();
    mock.queue_spi_response(&[0xA5, 0x5A]);
    let bus = device.create_spi_bus("SCK", "COPI", "CIPO", None).unwrap();
    let cs = device
        .create_digital_output_port("D02", true, OutputType::PushPull)
        .unwrap();

    let mut rx = [0u8; 2];
    bus.exchange(Some(&cs), &[0x9F, 0x00], &mut rx, ChipSelectMode::ActiveLow)
        .unwrap();
    assert_eq!(rx, [0xA5, 0x5A]);

    let writes: Vec<_> = mock
        .commands_for(NativeOpcode::GpioWrite)
        .into_iter()
        .map(|r| r.tx)
        .collect();
    assert_eq!(writes, vec![vec![0], vec![1]]);
    assert_eq!(mock.gpio_level(common::D02), Some(true));
}

#[test]
fn test_spi_chip_select_released_on_failure() {
    let (device, mock) = device();
    let bus = device.create_spi_bus("SCK", "COPI", "CIPO", None).unwrap();
    let cs = device
        .create_digital_output_port("D02", false, OutputType::PushPull)
        .unwrap();

    mock.inject_error(NativeOpcode::SpiData, NATIVE_EIO);
    let result = bus.transaction(Some(&cs), ChipSelectMode::ActiveHigh, |t| {
        t.write(&[1, 2, 3])?;
        t.write(&[4])
    });
    assert_eq!(result, Err(BusError::Communication { code: NATIVE_EIO }));
    assert_eq!(mock.gpio_level(common::D02), Some(false));
    // The second write never ran.
    assert_eq!(mock.commands_for(NativeOpcode::SpiData).len(), 1);
}

proptest! {
    /// The clamped speed is always supported, never above the request
    /// unless the request is below every supported speed, and monotonic.
    #[test]
    fn prop_clamp_is_monotonic(a in 0u32..2_000_000, b in 0u32..2_000_000) {
        let supported = [I2C_STANDARD_HZ, I2C_FAST_HZ, I2C_FAST_PLUS_HZ];
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let clamped_lo = clamp_frequency(lo, &supported);
        let clamped_hi = clamp_frequency(hi, &supported);

        prop_assert!(supported.contains(&clamped_lo.effective_hz));
        prop_assert!(clamped_lo.effective_hz <= clamped_hi.effective_hz);
        if lo >= I2C_STANDARD_HZ {
            prop_assert!(clamped_lo.effective_hz <= lo);
        }
        prop_assert_eq!(clamped_lo.adjusted, clamped_lo.effective_hz != lo);
    }
}
