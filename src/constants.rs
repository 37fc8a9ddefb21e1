//! HAL Constants
//!
//! Fixed values shared by the bus engines, the analog sampler and the
//! coprocessor protocol.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Native status codes (NuttX errno values returned by the driver ioctl)
// ----------------------------------------------------------------------------

/// Transaction completed
pub const NATIVE_OK: i32 = 0;

/// Retry condition, usually SDA not connected
pub const NATIVE_EAGAIN: i32 = 11;

/// Bus was shut down
pub const NATIVE_ESHUTDOWN: i32 = 108;

/// No device answered at the requested address
pub const NATIVE_EHOSTDOWN: i32 = 112;

/// Clock line stuck, device unpowered or SCL disconnected
pub const NATIVE_ETIMEDOUT: i32 = 116;

/// Address not acknowledged, or SCL/SDA reversed
pub const NATIVE_ECANCELED: i32 = 125;

/// Generic I/O failure used by backends without a finer code
pub const NATIVE_EIO: i32 = 5;

/// Operation not supported by the backend
pub const NATIVE_ENOTSUP: i32 = 95;

// ----------------------------------------------------------------------------
// Bus speeds
// ----------------------------------------------------------------------------

/// I2C standard mode
pub const I2C_STANDARD_HZ: u32 = 100_000;

/// I2C fast mode
pub const I2C_FAST_HZ: u32 = 400_000;

/// I2C fast mode plus
pub const I2C_FAST_PLUS_HZ: u32 = 1_000_000;

/// Speeds accepted by the two-wire bus
pub const I2C_SUPPORTED_SPEEDS: [u32; 3] = [I2C_STANDARD_HZ, I2C_FAST_HZ, I2C_FAST_PLUS_HZ];

/// SPI clock ladder (48 MHz peripheral clock divided by powers of two)
pub const SPI_SUPPORTED_SPEEDS: [u32; 8] = [
    375_000, 750_000, 1_500_000, 3_000_000, 6_000_000, 12_000_000, 24_000_000, 48_000_000,
];

/// Default SPI clock
pub const SPI_DEFAULT_SPEED_HZ: u32 = 375_000;

// ----------------------------------------------------------------------------
// Analog sampling
// ----------------------------------------------------------------------------

/// Default number of samples per batch / per one-shot read
pub const ANALOG_DEFAULT_SAMPLE_COUNT: usize = 5;

/// Default delay between two samples of a batch
pub const ANALOG_DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(40);

/// Default delay between two batches
pub const ANALOG_DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Default ADC reference voltage in volts
pub const ANALOG_DEFAULT_REFERENCE_VOLTAGE: f64 = 3.3;

/// Maximum raw value of the 12-bit converter
pub const ADC_MAX_RAW_VALUE: u32 = 4095;

// ----------------------------------------------------------------------------
// Coprocessor
// ----------------------------------------------------------------------------

/// Largest response the coprocessor link will accept
pub const MAXIMUM_SPI_BUFFER_LENGTH: usize = 4000;

/// Interval at which `connect` re-checks the session state
pub const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Interval at which the event pump polls an idle coprocessor
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the inbound event channel between the pump and dispatcher
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default delay between access point scans
pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_secs(5);

/// Lower bound for the scan period
pub const MINIMUM_SCAN_PERIOD: Duration = Duration::from_secs(1);

/// Upper bound for the scan period
pub const MAXIMUM_SCAN_PERIOD: Duration = Duration::from_secs(60);

/// Lower bound for the coprocessor retry count
pub const MINIMUM_RETRY_COUNT: u32 = 3;

/// Capacity of the broadcast channels used for change notifications
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 32;
