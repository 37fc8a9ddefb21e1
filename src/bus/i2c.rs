//! Two-wire addressed bus.

use crate::bus::{BusError, TransactionEngine};
use crate::native::{NativeOpcode, NativeTransport};
use crate::pins::{I2cChannelFunction, Pin};
use std::sync::Arc;

/// Largest 7-bit peripheral address
const MAX_ADDRESS: u8 = 0x7F;

/// A two-wire bus bound to a clock and a data pin.
///
/// The bus does not reserve its pins; it only checks at construction that
/// they can carry the bus's channels.
#[derive(Debug)]
pub struct I2cBus {
    engine: TransactionEngine,
    clock: Pin,
    data: Pin,
}

impl I2cBus {
    /// Create a bus on `clock`/`data`. The initial `frequency_hz` is
    /// clamped to `supported`.
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        clock: &Pin,
        data: &Pin,
        frequency_hz: u32,
        supported: &[u32],
    ) -> Result<Self, BusError> {
        let bus_number = match clock.i2c_channel() {
            Some((bus, I2cChannelFunction::Clock)) => bus,
            _ => {
                return Err(BusError::InvalidPin {
                    pin: clock.name().to_string(),
                    reason: "no I2C clock capability".to_string(),
                })
            }
        };
        match data.i2c_channel() {
            Some((bus, I2cChannelFunction::Data)) if bus == bus_number => {}
            _ => {
                return Err(BusError::InvalidPin {
                    pin: data.name().to_string(),
                    reason: format!("no I2C{bus_number} data capability"),
                })
            }
        }

        let engine = TransactionEngine::new(transport, bus_number, frequency_hz, supported);
        log::info!(
            "I2C{} ready on {}/{} at {} Hz",
            bus_number,
            clock,
            data,
            engine.frequency()
        );

        Ok(Self {
            engine,
            clock: clock.clone(),
            data: data.clone(),
        })
    }

    pub fn clock_pin(&self) -> &Pin {
        &self.clock
    }

    pub fn data_pin(&self) -> &Pin {
        &self.data
    }

    pub fn frequency(&self) -> u32 {
        self.engine.frequency()
    }

    /// Change the clock. Unsupported speeds are rounded down to the nearest
    /// supported one (or up to the slowest) with a warning.
    pub fn set_frequency(&self, frequency_hz: u32) -> u32 {
        self.engine.set_frequency(frequency_hz)
    }

    pub fn supported_speeds(&self) -> &[u32] {
        self.engine.supported_speeds()
    }

    /// Read `buffer.len()` bytes from the peripheral at `address`.
    pub fn read(&self, address: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.transfer(address, &[], buffer)
    }

    /// Write `buffer` to the peripheral at `address`.
    pub fn write(&self, address: u8, buffer: &[u8]) -> Result<(), BusError> {
        self.transfer(address, buffer, &mut [])
    }

    /// Write `write_buffer` then read into `read_buffer` in one transaction.
    pub fn exchange(
        &self,
        address: u8,
        write_buffer: &[u8],
        read_buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.transfer(address, write_buffer, read_buffer)
    }

    /// Stop the bus controller. Later transactions fail with
    /// [`BusError::Shutdown`].
    pub fn shutdown(&self) -> Result<(), BusError> {
        self.engine
            .transact(NativeOpcode::I2cShutdown, 0, 0, &[], &mut [])?;
        log::info!("I2C{} shut down", self.engine.bus_number());
        Ok(())
    }

    fn transfer(&self, address: u8, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        if address > MAX_ADDRESS {
            return Err(BusError::InvalidAddress(u16::from(address)));
        }
        self.engine
            .transact(NativeOpcode::I2cData, u16::from(address), 0, tx, rx)
    }
}
