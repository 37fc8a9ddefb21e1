//! Register-level access to one device on a two-wire bus.

use crate::bus::{BusError, I2cBus};
use std::sync::Arc;

/// A two-wire bus handle bound to a peripheral address.
#[derive(Debug, Clone)]
pub struct I2cPeripheral {
    bus: Arc<I2cBus>,
    address: u8,
}

impl I2cPeripheral {
    pub fn new(bus: Arc<I2cBus>, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn bus(&self) -> &Arc<I2cBus> {
        &self.bus
    }

    pub fn read(&self, buffer: &mut [u8]) -> Result<(), BusError> {
        self.bus.read(self.address, buffer)
    }

    pub fn write(&self, buffer: &[u8]) -> Result<(), BusError> {
        self.bus.write(self.address, buffer)
    }

    pub fn read_register(&self, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.bus.exchange(self.address, &[register], &mut value)?;
        Ok(value[0])
    }

    /// Read `length` consecutive registers starting at `register`.
    pub fn read_registers(&self, register: u8, length: usize) -> Result<Vec<u8>, BusError> {
        let mut values = vec![0u8; length];
        self.bus.exchange(self.address, &[register], &mut values)?;
        Ok(values)
    }

    pub fn write_register(&self, register: u8, value: u8) -> Result<(), BusError> {
        self.bus.write(self.address, &[register, value])
    }

    /// Write `values` to consecutive registers starting at `register`.
    pub fn write_registers(&self, register: u8, values: &[u8]) -> Result<(), BusError> {
        let mut frame = Vec::with_capacity(values.len() + 1);
        frame.push(register);
        frame.extend_from_slice(values);
        self.bus.write(self.address, &frame)
    }

    /// Read a big-endian 16-bit register pair.
    pub fn read_u16_be(&self, register: u8) -> Result<u16, BusError> {
        let mut value = [0u8; 2];
        self.bus.exchange(self.address, &[register], &mut value)?;
        Ok(u16::from_be_bytes(value))
    }
}
