//! Four-wire full-duplex bus.
//!
//! Peripherals are selected with a digital output used as chip select. The
//! chip select is asserted after the bus lock is taken and is always
//! deasserted before the lock is released, including when the transfer
//! fails.

use crate::bus::{BusError, LockedBus, TransactionEngine};
use crate::native::{NativeOpcode, NativeTransport};
use crate::pins::{Pin, SpiChannelFunction};
use crate::ports::DigitalOutputPort;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Level on the chip-select line that activates the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipSelectMode {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl ChipSelectMode {
    fn active_level(self) -> bool {
        matches!(self, ChipSelectMode::ActiveHigh)
    }
}

/// Clock polarity and phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl SpiMode {
    fn to_bits(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => SpiMode::Mode0,
            1 => SpiMode::Mode1,
            2 => SpiMode::Mode2,
            _ => SpiMode::Mode3,
        }
    }
}

/// Clock settings applied to every transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiClockConfiguration {
    pub speed_hz: u32,
    pub mode: SpiMode,
}

impl SpiClockConfiguration {
    pub fn new(speed_hz: u32, mode: SpiMode) -> Self {
        Self { speed_hz, mode }
    }
}

/// Deasserts the chip select when dropped.
struct Selected<'a> {
    port: &'a DigitalOutputPort,
    mode: ChipSelectMode,
}

impl<'a> Selected<'a> {
    fn assert(port: &'a DigitalOutputPort, mode: ChipSelectMode) -> Result<Self, BusError> {
        port.set_state(mode.active_level())
            .map_err(|e| BusError::ChipSelect(e.to_string()))?;
        Ok(Self { port, mode })
    }
}

impl Drop for Selected<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.port.set_state(!self.mode.active_level()) {
            log::error!("Failed to release chip select {}: {e}", self.port.pin());
        }
    }
}

/// A four-wire bus bound to clock, MOSI and MISO pins.
#[derive(Debug)]
pub struct SpiBus {
    engine: TransactionEngine,
    mode: AtomicU8,
}

impl SpiBus {
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        clock: &Pin,
        mosi: &Pin,
        miso: &Pin,
        configuration: SpiClockConfiguration,
        supported: &[u32],
    ) -> Result<Self, BusError> {
        let bus_number = match clock.spi_channel() {
            Some((bus, SpiChannelFunction::Clock)) => bus,
            _ => {
                return Err(BusError::InvalidPin {
                    pin: clock.name().to_string(),
                    reason: "no SPI clock capability".to_string(),
                })
            }
        };
        for (pin, function, label) in [
            (mosi, SpiChannelFunction::Mosi, "MOSI"),
            (miso, SpiChannelFunction::Miso, "MISO"),
        ] {
            match pin.spi_channel() {
                Some((bus, f)) if bus == bus_number && f == function => {}
                _ => {
                    return Err(BusError::InvalidPin {
                        pin: pin.name().to_string(),
                        reason: format!("no SPI{bus_number} {label} capability"),
                    })
                }
            }
        }

        let engine =
            TransactionEngine::new(transport, bus_number, configuration.speed_hz, supported);
        log::info!(
            "SPI{} ready at {} Hz, {:?}",
            bus_number,
            engine.frequency(),
            configuration.mode
        );

        Ok(Self {
            engine,
            mode: AtomicU8::new(configuration.mode.to_bits()),
        })
    }

    /// Speeds the controller can generate, ascending.
    pub fn supported_speeds(&self) -> &[u32] {
        self.engine.supported_speeds()
    }

    pub fn configuration(&self) -> SpiClockConfiguration {
        SpiClockConfiguration {
            speed_hz: self.engine.frequency(),
            mode: SpiMode::from_bits(self.mode.load(Ordering::SeqCst)),
        }
    }

    /// Apply new clock settings. The speed is clamped to the supported set;
    /// the configuration actually in effect is returned.
    pub fn set_configuration(&self, configuration: SpiClockConfiguration) -> SpiClockConfiguration {
        let _bus = self.engine.acquire();
        self.engine.set_frequency(configuration.speed_hz);
        self.mode
            .store(configuration.mode.to_bits(), Ordering::SeqCst);
        SpiClockConfiguration {
            speed_hz: self.engine.frequency(),
            mode: configuration.mode,
        }
    }

    /// Clock in `read_buffer.len()` bytes while sending zeros.
    pub fn read(
        &self,
        chip_select: Option<&DigitalOutputPort>,
        read_buffer: &mut [u8],
        mode: ChipSelectMode,
    ) -> Result<(), BusError> {
        self.transfer(chip_select, mode, &[], read_buffer)
    }

    pub fn write(
        &self,
        chip_select: Option<&DigitalOutputPort>,
        write_buffer: &[u8],
        mode: ChipSelectMode,
    ) -> Result<(), BusError> {
        self.transfer(chip_select, mode, write_buffer, &mut [])
    }

    /// Send `write_buffer` while reading into `read_buffer`.
    pub fn exchange(
        &self,
        chip_select: Option<&DigitalOutputPort>,
        write_buffer: &[u8],
        read_buffer: &mut [u8],
        mode: ChipSelectMode,
    ) -> Result<(), BusError> {
        self.transfer(chip_select, mode, write_buffer, read_buffer)
    }

    /// Run several transfers under one lock and one chip-select assertion.
    pub fn transaction<R>(
        &self,
        chip_select: Option<&DigitalOutputPort>,
        mode: ChipSelectMode,
        f: impl FnOnce(&SpiTransaction<'_>) -> Result<R, BusError>,
    ) -> Result<R, BusError> {
        let bus = self.engine.acquire();
        let _selected = chip_select
            .map(|port| Selected::assert(port, mode))
            .transpose()?;
        f(&SpiTransaction {
            bus: &bus,
            flags: self.mode.load(Ordering::SeqCst),
        })
    }

    fn transfer(
        &self,
        chip_select: Option<&DigitalOutputPort>,
        mode: ChipSelectMode,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<(), BusError> {
        self.transaction(chip_select, mode, |t| t.exchange(tx, rx))
    }
}

/// Transfers issued while a [`SpiBus::transaction`] holds the bus.
pub struct SpiTransaction<'a> {
    bus: &'a LockedBus<'a>,
    flags: u8,
}

impl SpiTransaction<'_> {
    pub fn write(&self, tx: &[u8]) -> Result<(), BusError> {
        self.exchange(tx, &mut [])
    }

    pub fn read(&self, rx: &mut [u8]) -> Result<(), BusError> {
        self.exchange(&[], rx)
    }

    pub fn exchange(&self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        self.bus
            .transact(NativeOpcode::SpiData, 0, self.flags, tx, rx)
    }
}
