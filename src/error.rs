//! # HAL Error Handling
//!
//! Each subsystem reports failures through its own `thiserror` enum. This
//! module defines [`HalError`], the crate-wide error that application code
//! can use when it does not care which subsystem failed.

use thiserror::Error;

pub use crate::bus::BusError;
pub use crate::config::ConfigError;
pub use crate::coprocessor::{CoprocessorError, DecodeError};
pub use crate::network::NetworkError;
pub use crate::pins::ReservationError;
pub use crate::ports::PortError;

/// Represents any error raised by the HAL.
#[derive(Debug, Error)]
pub enum HalError {
    /// A pin could not be claimed or released.
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// A bus transaction or native call failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A port could not be created or driven.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The wireless coprocessor rejected or failed an operation.
    #[error(transparent)]
    Coprocessor(#[from] CoprocessorError),

    /// A coprocessor frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A network adapter could not be registered.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A named pin is not present in the device's pin table.
    #[error("Unknown pin: {0}")]
    UnknownPin(String),
}

/// Convenience alias for results carrying a [`HalError`].
pub type Result<T> = std::result::Result<T, HalError>;
