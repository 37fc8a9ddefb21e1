//! Board description shared by the integration tests.

#![allow(dead_code)]

use periph_hal::native::MockTransport;
use periph_hal::pins::{ChannelInfo, I2cChannelFunction, Pin, SpiChannelFunction};
use periph_hal::{Device, HalConfig};
use std::sync::Arc;

fn digital(interrupt: bool) -> ChannelInfo {
    ChannelInfo::Digital {
        input: true,
        output: true,
        interrupt,
    }
}

/// Pin keys used by the tests
pub const D00: u16 = 0;
pub const D01: u16 = 1;
pub const D02: u16 = 2;
pub const D03: u16 = 3;
pub const A00: u16 = 100;
pub const A01: u16 = 101;

pub fn board_pins() -> Vec<Pin> {
    vec![
        Pin::new("D00", D00, vec![digital(true)]),
        Pin::new("D01", D01, vec![digital(false)]),
        Pin::new("D02", D02, vec![digital(false)]),
        Pin::new(
            "D03",
            D03,
            vec![ChannelInfo::Digital {
                input: true,
                output: false,
                interrupt: false,
            }],
        ),
        Pin::new(
            "A00",
            A00,
            vec![
                ChannelInfo::Analog {
                    precision_bits: 12,
                    input: true,
                    output: false,
                },
                digital(false),
            ],
        ),
        Pin::new(
            "A01",
            A01,
            vec![ChannelInfo::Analog {
                precision_bits: 12,
                input: true,
                output: false,
            }],
        ),
        Pin::new(
            "D08",
            8,
            vec![
                ChannelInfo::I2c {
                    bus: 1,
                    function: I2cChannelFunction::Clock,
                },
                digital(false),
            ],
        ),
        Pin::new(
            "D07",
            7,
            vec![
                ChannelInfo::I2c {
                    bus: 1,
                    function: I2cChannelFunction::Data,
                },
                digital(false),
            ],
        ),
        Pin::new(
            "SCK",
            20,
            vec![ChannelInfo::Spi {
                bus: 2,
                function: SpiChannelFunction::Clock,
            }],
        ),
        Pin::new(
            "COPI",
            21,
            vec![ChannelInfo::Spi {
                bus: 2,
                function: SpiChannelFunction::Mosi,
            }],
        ),
        Pin::new(
            "CIPO",
            22,
            vec![ChannelInfo::Spi {
                bus: 2,
                function: SpiChannelFunction::Miso,
            }],
        ),
        Pin::new("D09", 9, vec![ChannelInfo::Pwm { timer: 3, channel: 1 }]),
    ]
}

pub fn pin(name: &str) -> Pin {
    board_pins()
        .into_iter()
        .find(|p| p.name() == name)
        .expect("pin in test board")
}

/// A device over a fresh mock driver with the given configuration.
pub fn device_with(config: HalConfig) -> (Device, Arc<MockTransport>) {
    let mock = Arc::new(MockTransport::new());
    let device = Device::new(mock.clone(), board_pins(), config).expect("valid device");
    (device, mock)
}

pub fn device() -> (Device, Arc<MockTransport>) {
    device_with(HalConfig::default())
}
