//! # Ports
//!
//! Typed handles over reserved pins. Constructing a port claims its pin in
//! the [`PinArbiter`]; dropping the port releases the claim. A pin that
//! lacks the required channel, or that is already claimed, makes the
//! constructor fail with a [`PortError`].

pub mod analog;
pub mod digital;

pub use analog::{AnalogInputPort, AnalogPortOptions};
pub use digital::{
    BiDirectionalConfig, BiDirectionalPort, DigitalInputPort, DigitalOutputPort, InterruptMode,
    OutputType, PortDirection, ResistorMode,
};

use crate::bus::{self, BusError};
use crate::native::{GpioFlags, NativeCommand, NativeOpcode, NativeTransport};
use crate::pins::{ChannelConfigurationType, Pin, PinArbiter, ReservationError, ReservationToken};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while creating or driving a port
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PortError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Native(#[from] BusError),

    #[error("Pin {pin} is not capable of interrupts")]
    InterruptNotSupported { pin: String },

    #[error("{name} is out of range (0-1000 ms): {value:?}")]
    DurationOutOfRange { name: &'static str, value: Duration },

    #[error("Invalid port configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No async runtime available to run the sampling task")]
    NoRuntime,
}

/// A live reservation held by a port. Released on drop.
#[derive(Debug)]
pub(crate) struct PinClaim {
    pin: Pin,
    arbiter: Arc<PinArbiter>,
    token: Option<ReservationToken>,
}

impl PinClaim {
    /// Reserve `pin` for `kind` after checking its capabilities.
    pub(crate) fn acquire(
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        kind: ChannelConfigurationType,
    ) -> Result<Self, ReservationError> {
        let token = arbiter.reserve_checked(pin, kind)?;
        Ok(Self::from_token(arbiter, pin, token))
    }

    /// Reserve `pin` for `kind` without a capability check.
    pub(crate) fn acquire_unchecked(
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        kind: ChannelConfigurationType,
    ) -> Result<Self, ReservationError> {
        let token = arbiter.reserve(pin, kind)?;
        Ok(Self::from_token(arbiter, pin, token))
    }

    fn from_token(arbiter: Arc<PinArbiter>, pin: &Pin, token: ReservationToken) -> Self {
        Self {
            pin: pin.clone(),
            arbiter,
            token: Some(token),
        }
    }

    pub(crate) fn pin(&self) -> &Pin {
        &self.pin
    }
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(e) = self.arbiter.release(token) {
                log::error!("Failed to release pin {}: {e}", self.pin);
            }
        }
    }
}

/// Issue a GPIO opcode against `pin`.
pub(crate) fn gpio_call(
    transport: &dyn NativeTransport,
    pin: &Pin,
    opcode: NativeOpcode,
    flags: GpioFlags,
    tx: &[u8],
    rx: &mut [u8],
) -> Result<(), BusError> {
    let mut command = NativeCommand::new(pin.key())
        .flags(flags.bits())
        .tx(tx)
        .rx(rx);
    bus::issue(transport, opcode, &mut command)
}
