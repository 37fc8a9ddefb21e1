//! # periph-hal - Host-Side Hardware Abstraction Layer
//!
//! The periph-hal crate gives application code safe, typed access to the
//! peripherals of a microcontroller-class board through its native driver:
//!
//! - Pin arbitration: every pin is claimed by at most one port at a time
//! - Bus transactions: I2C and SPI transfers serialized per bus, with
//!   native status codes mapped to typed errors
//! - WiFi coprocessor: command/event protocol to an ESP32 with a
//!   connection state machine, timeouts and cancellation
//! - Analog sampling: background acquisition with batch buffering and
//!   change notifications
//!
//! ## Usage
//!
//! ```rust
//! use periph_hal::native::MockTransport;
//! use periph_hal::pins::{ChannelInfo, I2cChannelFunction, Pin};
//! use periph_hal::{Device, HalConfig};
//! use std::sync::Arc;
//!
//! let pins = vec![
//!     Pin::new("D08", 8, vec![ChannelInfo::I2c { bus: 1, function: I2cChannelFunction::Clock }]),
//!     Pin::new("D07", 7, vec![ChannelInfo::I2c { bus: 1, function: I2cChannelFunction::Data }]),
//! ];
//! let mock = Arc::new(MockTransport::new());
//! mock.queue_i2c_response(0x48, &[0x12, 0x34]);
//!
//! let device = Device::new(mock, pins, HalConfig::default()).unwrap();
//! let bus = device.create_i2c_bus("D08", "D07", None).unwrap();
//! let mut buffer = [0u8; 2];
//! bus.read(0x48, &mut buffer).unwrap();
//! assert_eq!(buffer, [0x12, 0x34]);
//! ```

pub mod adc;
pub mod bus;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod coprocessor;
pub mod device;
pub mod error;
pub mod logging;
pub mod native;
pub mod network;
pub mod pins;
pub mod ports;
pub mod units;
pub mod util;

pub use crate::error::{HalError, Result};
pub use crate::logging::{init_logger, log_info};

// Core handles
pub use adc::AnalogConverter;
pub use cancel::CancelToken;
pub use config::HalConfig;
pub use device::Device;

// Buses and ports
pub use bus::{
    BusError, ChipSelectMode, I2cBus, I2cPeripheral, SpiBus, SpiClockConfiguration, SpiMode,
};
pub use pins::{ChannelConfigurationType, Pin, PinArbiter, PinDefinitions, ReservationError};
pub use ports::{
    AnalogInputPort, AnalogPortOptions, BiDirectionalPort, DigitalInputPort, DigitalOutputPort,
    PortError,
};

// Coprocessor and networking
pub use coprocessor::{CoprocessorError, Esp32WiFiAdapter, WiFiEvent, WiFiNetwork, WiFiState};
pub use network::{NetworkAdapter, NetworkAdapterRegistry, NetworkEvent};

// Units
pub use units::{ChangeResult, DigitalState, Voltage};
