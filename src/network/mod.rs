//! # Network Adapters
//!
//! [`NetworkAdapter`] is the interface every network adapter on the device
//! implements, whatever its medium. [`NetworkAdapterRegistry`] collects the
//! adapters and fans their connectivity events out to one subscriber
//! stream, each event tagged with the index of the adapter it came from.

pub mod registry;

pub use registry::{AdapterEvent, NetworkAdapterRegistry};

use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors raised by the adapter registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("No async runtime available to forward adapter events")]
    NoRuntime,
}

/// Connectivity change reported by an adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Connected,
    Disconnected,
    Error(String),
}

/// A network interface of the device
pub trait NetworkAdapter: Send + Sync + fmt::Debug {
    /// Short human readable name, e.g. `wifi`.
    fn name(&self) -> &str;

    fn is_connected(&self) -> bool;

    fn mac_address(&self) -> Option<[u8; 6]>;

    /// Connectivity events from now on.
    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent>;
}
