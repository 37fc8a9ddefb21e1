//! # Bus Transactions
//!
//! A bus instance owns one mutual-exclusion primitive and a clock setting.
//! Every read, write or exchange takes that lock for the whole native call,
//! so no two transactions on the same bus ever overlap, whichever port or
//! peripheral issued them. Failures are translated from native status codes
//! into [`BusError`] and returned as-is; this layer never retries.
//!
//! ## Components
//!
//! - [`TransactionEngine`]: lock, clock and native call shared by both buses
//! - [`I2cBus`]: addressed two-wire bus
//! - [`SpiBus`]: full-duplex four-wire bus with chip select
//! - [`I2cPeripheral`]: register-level helper bound to one address

pub mod i2c;
pub mod peripheral;
pub mod spi;

pub use i2c::I2cBus;
pub use peripheral::I2cPeripheral;
pub use spi::{ChipSelectMode, SpiBus, SpiClockConfiguration, SpiMode, SpiTransaction};

use crate::constants::{
    NATIVE_EAGAIN, NATIVE_ECANCELED, NATIVE_EHOSTDOWN, NATIVE_ESHUTDOWN, NATIVE_ETIMEDOUT,
    NATIVE_OK,
};
use crate::native::{NativeCommand, NativeOpcode, NativeTransport};
use crate::util::lock;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors raised by bus transactions and other native calls
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Native code 125
    #[error("Device at address 0x{address:02X} did not acknowledge; check the address and that SCL and SDA are not reversed")]
    NoAcknowledge { address: u16 },

    /// Native code 116
    #[error("Bus line disconnected; check that the device is powered and SCL is connected")]
    LineDisconnected,

    /// Native code 112
    #[error("No device found at address 0x{address:02X}")]
    NoDevice { address: u16 },

    /// Native code 11
    #[error("Bus busy, retry the transaction; check that SDA is connected")]
    Retry,

    /// Native code 108
    #[error("Bus has been shut down")]
    Shutdown,

    /// Any code without a specific mapping
    #[error("Communication error (native code {code})")]
    Communication { code: i32 },

    #[error("Invalid pin {pin}: {reason}")]
    InvalidPin { pin: String, reason: String },

    #[error("Invalid peripheral address 0x{0:02X}")]
    InvalidAddress(u16),

    #[error("Chip select failed: {0}")]
    ChipSelect(String),
}

impl BusError {
    /// Translate a non-zero native status. `target` is the peripheral
    /// address the call was made against.
    pub fn from_native(code: i32, target: u16) -> Self {
        match code {
            NATIVE_ECANCELED => BusError::NoAcknowledge { address: target },
            NATIVE_ETIMEDOUT => BusError::LineDisconnected,
            NATIVE_EHOSTDOWN => BusError::NoDevice { address: target },
            NATIVE_EAGAIN => BusError::Retry,
            NATIVE_ESHUTDOWN => BusError::Shutdown,
            code => BusError::Communication { code },
        }
    }

    /// The native code this error was produced from, when there is one.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            BusError::NoAcknowledge { .. } => Some(NATIVE_ECANCELED),
            BusError::LineDisconnected => Some(NATIVE_ETIMEDOUT),
            BusError::NoDevice { .. } => Some(NATIVE_EHOSTDOWN),
            BusError::Retry => Some(NATIVE_EAGAIN),
            BusError::Shutdown => Some(NATIVE_ESHUTDOWN),
            BusError::Communication { code } => Some(*code),
            _ => None,
        }
    }
}

/// Issue one native call and translate its status.
pub(crate) fn issue(
    transport: &dyn NativeTransport,
    opcode: NativeOpcode,
    command: &mut NativeCommand<'_>,
) -> Result<(), BusError> {
    match transport.ioctl(opcode, command) {
        NATIVE_OK => Ok(()),
        code => {
            log::debug!(
                "{opcode} on target 0x{:02X} failed with native code {code}",
                command.target
            );
            Err(BusError::from_native(code, command.target))
        }
    }
}

/// Result of mapping a requested clock onto a bus's supported speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedFrequency {
    pub effective_hz: u32,
    /// `true` when the effective speed differs from the request
    pub adjusted: bool,
}

/// Pick the fastest supported speed at or below `requested_hz`, or the
/// slowest supported speed when the request is below all of them.
pub fn clamp_frequency(requested_hz: u32, supported: &[u32]) -> ClampedFrequency {
    let effective_hz = supported
        .iter()
        .copied()
        .filter(|s| *s <= requested_hz)
        .max()
        .or_else(|| supported.iter().copied().min())
        .unwrap_or(requested_hz);

    ClampedFrequency {
        effective_hz,
        adjusted: effective_hz != requested_hz,
    }
}

/// Lock, clock setting and native entry point shared by a bus's
/// transactions.
pub struct TransactionEngine {
    transport: Arc<dyn NativeTransport>,
    bus_number: u8,
    lock: Mutex<()>,
    frequency_hz: AtomicU32,
    supported: Vec<u32>,
}

impl fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("bus_number", &self.bus_number)
            .field("frequency_hz", &self.frequency())
            .field("supported", &self.supported)
            .finish()
    }
}

impl TransactionEngine {
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        bus_number: u8,
        frequency_hz: u32,
        supported: &[u32],
    ) -> Self {
        let mut supported = supported.to_vec();
        supported.sort_unstable();
        supported.dedup();

        let engine = Self {
            transport,
            bus_number,
            lock: Mutex::new(()),
            frequency_hz: AtomicU32::new(frequency_hz),
            supported,
        };
        engine.set_frequency(frequency_hz);
        engine
    }

    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn frequency(&self) -> u32 {
        self.frequency_hz.load(Ordering::SeqCst)
    }

    /// Supported speeds in ascending order.
    pub fn supported_speeds(&self) -> &[u32] {
        &self.supported
    }

    /// Apply a new clock, clamped to the supported set. Returns the speed
    /// actually used; an adjustment is logged as a warning.
    pub fn set_frequency(&self, requested_hz: u32) -> u32 {
        let clamped = clamp_frequency(requested_hz, &self.supported);
        if clamped.adjusted {
            log::warn!(
                "Bus {}: {} Hz is not supported, using {} Hz",
                self.bus_number,
                requested_hz,
                clamped.effective_hz
            );
        }
        self.frequency_hz
            .store(clamped.effective_hz, Ordering::SeqCst);
        clamped.effective_hz
    }

    /// Take the bus for a sequence of native calls.
    pub fn acquire(&self) -> LockedBus<'_> {
        LockedBus {
            engine: self,
            _guard: lock(&self.lock),
        }
    }

    /// Run a single native call under the bus lock.
    pub fn transact(
        &self,
        opcode: NativeOpcode,
        target: u16,
        flags: u8,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<(), BusError> {
        self.acquire().transact(opcode, target, flags, tx, rx)
    }
}

/// Exclusive access to a bus. Dropping it releases the lock.
pub struct LockedBus<'a> {
    engine: &'a TransactionEngine,
    _guard: MutexGuard<'a, ()>,
}

impl LockedBus<'_> {
    pub fn transact(
        &self,
        opcode: NativeOpcode,
        target: u16,
        flags: u8,
        tx: &[u8],
        rx: &mut [u8],
    ) -> Result<(), BusError> {
        let mut command = NativeCommand::new(target)
            .bus(self.engine.bus_number)
            .frequency(self.engine.frequency())
            .flags(flags)
            .tx(tx)
            .rx(rx);
        issue(self.engine.transport.as_ref(), opcode, &mut command)
    }
}
