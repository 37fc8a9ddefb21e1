//! # Wireless Coprocessor
//!
//! Host side of the command/event protocol spoken by the ESP32 that
//! handles WiFi for the device.
//!
//! ## Layers
//!
//! - [`protocol`]: frame and payload encoding
//! - [`transport`]: how frames reach the coprocessor (SPI) and the event pump
//! - [`state`]: the connection state machine, a pure function of
//!   `(session, event)`
//! - [`wifi`]: [`Esp32WiFiAdapter`], the public adapter surface
//! - [`mock`]: a scripted coprocessor for tests and host tools
//!
//! Inbound events are delivered over an `mpsc` channel to a single
//! dispatch task, so they are applied strictly in arrival order.

pub mod mock;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod wifi;

pub use mock::MockCoprocessor;
pub use protocol::{
    decode_access_point_list, encode_access_point_list, AntennaType, AuthenticationMode,
    Command, ConnectEventData, DecodeError, EventFrame, Interface, Response, StatusCode,
    WiFiCredentials, WiFiFunction, WiFiNetwork,
};
pub use state::{ConnectionDetails, Session, Transition, WiFiEvent, WiFiState};
pub use transport::{event_pump, CoprocessorTransport, SpiCoprocessorTransport};
pub use wifi::{ConnectionStatus, Esp32WiFiAdapter};

use crate::bus::BusError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by coprocessor operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoprocessorError {
    /// The operation is not allowed in the current connection state
    #[error("Operation not allowed while the adapter is {state:?}")]
    StateConflict { state: WiFiState },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded wait expired; the coprocessor may still be working
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    /// The coprocessor reported a failed connection attempt
    #[error("Connection error: {status}")]
    ConnectionFailed { status: StatusCode },

    /// The attempt ended in a state other than connected or error
    #[error("Connection attempt ended in state {state:?}")]
    NotConnected { state: WiFiState },

    /// A command was answered with a non-success status
    #[error("{operation} failed: {status}")]
    Status {
        operation: &'static str,
        status: StatusCode,
    },

    #[error("Setting the antenna type NotKnown is not allowed")]
    InvalidAntenna,

    #[error(transparent)]
    Transport(#[from] BusError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Coprocessor task failed: {0}")]
    TaskFailed(String),

    #[error("No async runtime available to run the coprocessor tasks")]
    NoRuntime,
}
