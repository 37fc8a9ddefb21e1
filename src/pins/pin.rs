//! # Pin Identity and Channel Capabilities
//!
//! A [`Pin`] is an immutable description taken from the device's pin table:
//! a name, the native key used by the driver ioctl, and the set of channels
//! the silicon can route to it. Nothing in the HAL owns or deletes a pin;
//! ports refer to it by identity and claim it through the
//! [`PinArbiter`](crate::pins::PinArbiter).

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flat view of what a pin can be configured as.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelCapabilities: u16 {
        const DIGITAL_INPUT  = 1 << 0;
        const DIGITAL_OUTPUT = 1 << 1;
        const INTERRUPT      = 1 << 2;
        const ANALOG_INPUT   = 1 << 3;
        const ANALOG_OUTPUT  = 1 << 4;
        const PWM            = 1 << 5;
        const I2C_CLOCK      = 1 << 6;
        const I2C_DATA       = 1 << 7;
        const SPI_CLOCK      = 1 << 8;
        const SPI_MOSI       = 1 << 9;
        const SPI_MISO       = 1 << 10;
        const UART_TX        = 1 << 11;
        const UART_RX        = 1 << 12;
    }
}

/// Role of a pin on a two-wire bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum I2cChannelFunction {
    Clock,
    Data,
}

/// Role of a pin on a four-wire bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpiChannelFunction {
    Clock,
    Mosi,
    Miso,
}

/// Role of a pin on a UART
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UartChannelFunction {
    Transmit,
    Receive,
}

/// One hardware channel that can be routed to a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelInfo {
    Digital {
        input: bool,
        output: bool,
        interrupt: bool,
    },
    Analog {
        precision_bits: u8,
        input: bool,
        output: bool,
    },
    Pwm {
        timer: u8,
        channel: u8,
    },
    I2c {
        bus: u8,
        function: I2cChannelFunction,
    },
    Spi {
        bus: u8,
        function: SpiChannelFunction,
    },
    Uart {
        port: u8,
        function: UartChannelFunction,
    },
}

impl ChannelInfo {
    /// Short name used in diagnostics, e.g. `A00`, `I2C1_SCL`.
    pub fn name(&self) -> String {
        match self {
            ChannelInfo::Digital { .. } => "GPIO".to_string(),
            ChannelInfo::Analog { .. } => "ADC".to_string(),
            ChannelInfo::Pwm { timer, channel } => format!("PWM{timer}_CH{channel}"),
            ChannelInfo::I2c { bus, function } => match function {
                I2cChannelFunction::Clock => format!("I2C{bus}_SCL"),
                I2cChannelFunction::Data => format!("I2C{bus}_SDA"),
            },
            ChannelInfo::Spi { bus, function } => match function {
                SpiChannelFunction::Clock => format!("SPI{bus}_SCK"),
                SpiChannelFunction::Mosi => format!("SPI{bus}_MOSI"),
                SpiChannelFunction::Miso => format!("SPI{bus}_MISO"),
            },
            ChannelInfo::Uart { port, function } => match function {
                UartChannelFunction::Transmit => format!("UART{port}_TX"),
                UartChannelFunction::Receive => format!("UART{port}_RX"),
            },
        }
    }

    pub fn capabilities(&self) -> ChannelCapabilities {
        match self {
            ChannelInfo::Digital {
                input,
                output,
                interrupt,
            } => {
                let mut caps = ChannelCapabilities::empty();
                caps.set(ChannelCapabilities::DIGITAL_INPUT, *input);
                caps.set(ChannelCapabilities::DIGITAL_OUTPUT, *output);
                caps.set(ChannelCapabilities::INTERRUPT, *interrupt);
                caps
            }
            ChannelInfo::Analog { input, output, .. } => {
                let mut caps = ChannelCapabilities::empty();
                caps.set(ChannelCapabilities::ANALOG_INPUT, *input);
                caps.set(ChannelCapabilities::ANALOG_OUTPUT, *output);
                caps
            }
            ChannelInfo::Pwm { .. } => ChannelCapabilities::PWM,
            ChannelInfo::I2c { function, .. } => match function {
                I2cChannelFunction::Clock => ChannelCapabilities::I2C_CLOCK,
                I2cChannelFunction::Data => ChannelCapabilities::I2C_DATA,
            },
            ChannelInfo::Spi { function, .. } => match function {
                SpiChannelFunction::Clock => ChannelCapabilities::SPI_CLOCK,
                SpiChannelFunction::Mosi => ChannelCapabilities::SPI_MOSI,
                SpiChannelFunction::Miso => ChannelCapabilities::SPI_MISO,
            },
            ChannelInfo::Uart { function, .. } => match function {
                UartChannelFunction::Transmit => ChannelCapabilities::UART_TX,
                UartChannelFunction::Receive => ChannelCapabilities::UART_RX,
            },
        }
    }
}

/// How a port has configured a pin. Exactly one per live reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelConfigurationType {
    DigitalInput,
    DigitalOutput,
    AnalogInput,
    AnalogOutput,
    Pwm,
    I2c,
    Spi,
    Uart,
}

impl ChannelConfigurationType {
    /// Capabilities of which at least one must be present on the pin.
    pub fn required_capabilities(&self) -> ChannelCapabilities {
        match self {
            ChannelConfigurationType::DigitalInput => ChannelCapabilities::DIGITAL_INPUT,
            ChannelConfigurationType::DigitalOutput => ChannelCapabilities::DIGITAL_OUTPUT,
            ChannelConfigurationType::AnalogInput => ChannelCapabilities::ANALOG_INPUT,
            ChannelConfigurationType::AnalogOutput => ChannelCapabilities::ANALOG_OUTPUT,
            ChannelConfigurationType::Pwm => ChannelCapabilities::PWM,
            ChannelConfigurationType::I2c => {
                ChannelCapabilities::I2C_CLOCK | ChannelCapabilities::I2C_DATA
            }
            ChannelConfigurationType::Spi => {
                ChannelCapabilities::SPI_CLOCK
                    | ChannelCapabilities::SPI_MOSI
                    | ChannelCapabilities::SPI_MISO
            }
            ChannelConfigurationType::Uart => {
                ChannelCapabilities::UART_TX | ChannelCapabilities::UART_RX
            }
        }
    }
}

impl fmt::Display for ChannelConfigurationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelConfigurationType::DigitalInput => "digital input",
            ChannelConfigurationType::DigitalOutput => "digital output",
            ChannelConfigurationType::AnalogInput => "analog input",
            ChannelConfigurationType::AnalogOutput => "analog output",
            ChannelConfigurationType::Pwm => "PWM",
            ChannelConfigurationType::I2c => "I2C",
            ChannelConfigurationType::Spi => "SPI",
            ChannelConfigurationType::Uart => "UART",
        };
        f.write_str(name)
    }
}

/// A physical pin as described by the device's pin table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pin {
    name: String,
    key: u16,
    channels: Vec<ChannelInfo>,
}

impl Pin {
    pub fn new(name: impl Into<String>, key: u16, channels: Vec<ChannelInfo>) -> Self {
        Self {
            name: name.into(),
            key,
            channels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier understood by the native driver.
    pub fn key(&self) -> u16 {
        self.key
    }

    pub fn supported_channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    pub fn capabilities(&self) -> ChannelCapabilities {
        self.channels
            .iter()
            .fold(ChannelCapabilities::empty(), |acc, c| acc | c.capabilities())
    }

    pub fn supports(&self, kind: ChannelConfigurationType) -> bool {
        self.capabilities().intersects(kind.required_capabilities())
    }

    /// Comma-separated channel names, for error messages.
    pub fn describe_channels(&self) -> String {
        self.channels
            .iter()
            .map(ChannelInfo::name)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn digital_channel(&self) -> Option<&ChannelInfo> {
        self.channels
            .iter()
            .find(|c| matches!(c, ChannelInfo::Digital { .. }))
    }

    pub fn analog_channel(&self) -> Option<&ChannelInfo> {
        self.channels
            .iter()
            .find(|c| matches!(c, ChannelInfo::Analog { input: true, .. }))
    }

    pub fn i2c_channel(&self) -> Option<(u8, I2cChannelFunction)> {
        self.channels.iter().find_map(|c| match c {
            ChannelInfo::I2c { bus, function } => Some((*bus, *function)),
            _ => None,
        })
    }

    pub fn spi_channel(&self) -> Option<(u8, SpiChannelFunction)> {
        self.channels.iter().find_map(|c| match c {
            ChannelInfo::Spi { bus, function } => Some((*bus, *function)),
            _ => None,
        })
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Narrow view of a per-model pin table.
pub trait PinDefinitions {
    fn all_pins(&self) -> &[Pin];

    fn find(&self, name: &str) -> Option<&Pin> {
        self.all_pins().iter().find(|p| p.name() == name)
    }
}

impl PinDefinitions for Vec<Pin> {
    fn all_pins(&self) -> &[Pin] {
        self
    }
}
