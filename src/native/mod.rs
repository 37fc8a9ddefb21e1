//! # Native Driver Boundary
//!
//! All hardware access funnels through one syscall-style entry point,
//! [`NativeTransport::ioctl`]. A call carries an opcode and a
//! [`NativeCommand`] record that borrows the caller's buffers for exactly
//! the duration of the call; the driver returns `0` on success or an errno
//! style code that the bus layer maps to a typed error.
//!
//! Two backends are provided: [`mock::MockTransport`], a scripted
//! in-process simulation used by the tests, and (with the `raspberry-pi`
//! feature) a backend built on `rppal`.

pub mod mock;
#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

use bitflags::bitflags;
use std::fmt;

pub use mock::{CommandRecord, MockTransport};
#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::RppalTransport;

/// Operation selector passed to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOpcode {
    /// Combined write-then-read on a two-wire bus
    I2cData,
    I2cShutdown,
    /// Full-duplex transfer on a four-wire bus
    SpiData,
    GpioConfigure,
    GpioUnconfigure,
    GpioWrite,
    GpioRead,
    /// One conversion; the raw value is returned as a little-endian u32
    AdcRead,
}

impl fmt::Display for NativeOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Pin configuration carried in [`NativeCommand::flags`] for GPIO opcodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GpioFlags: u8 {
        const OUTPUT            = 1 << 0;
        const PULL_UP           = 1 << 1;
        const PULL_DOWN         = 1 << 2;
        const OPEN_DRAIN        = 1 << 3;
        const INITIAL_HIGH      = 1 << 4;
        const INTERRUPT_RISING  = 1 << 5;
        const INTERRUPT_FALLING = 1 << 6;
    }
}

/// Fixed-layout command record for one native call.
///
/// `tx` and `rx` are borrowed from the caller; the driver may only touch
/// them while the call is in progress.
#[derive(Debug)]
pub struct NativeCommand<'a> {
    /// Bus number for bus opcodes, unused otherwise
    pub bus: u8,
    /// Peripheral address, or pin key for GPIO and ADC opcodes
    pub target: u16,
    pub frequency_hz: u32,
    /// SPI mode (0-3) or [`GpioFlags`] bits
    pub flags: u8,
    pub tx: &'a [u8],
    pub rx: &'a mut [u8],
}

impl<'a> NativeCommand<'a> {
    pub fn new(target: u16) -> Self {
        Self {
            bus: 0,
            target,
            frequency_hz: 0,
            flags: 0,
            tx: &[],
            rx: &mut [],
        }
    }

    pub fn bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    pub fn frequency(mut self, frequency_hz: u32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn tx(mut self, tx: &'a [u8]) -> Self {
        self.tx = tx;
        self
    }

    pub fn rx(mut self, rx: &'a mut [u8]) -> Self {
        self.rx = rx;
        self
    }
}

/// The single entry point into the native driver.
pub trait NativeTransport: Send + Sync + fmt::Debug {
    /// Execute one command. Returns `0` on success, otherwise the driver's
    /// error code.
    fn ioctl(&self, opcode: NativeOpcode, command: &mut NativeCommand<'_>) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let tx = [1u8, 2, 3];
        let mut rx = [0u8; 4];
        let cmd = NativeCommand::new(0x48)
            .bus(1)
            .frequency(400_000)
            .tx(&tx)
            .rx(&mut rx);
        assert_eq!(cmd.bus, 1);
        assert_eq!(cmd.target, 0x48);
        assert_eq!(cmd.frequency_hz, 400_000);
        assert_eq!(cmd.tx.len(), 3);
        assert_eq!(cmd.rx.len(), 4);
    }
}
