//! Registry of the device's network adapters.

use crate::constants::NOTIFICATION_CHANNEL_CAPACITY;
use crate::network::{NetworkAdapter, NetworkError, NetworkEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// An adapter event tagged with the adapter's registry index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEvent {
    pub index: usize,
    pub event: NetworkEvent,
}

/// Ordered collection of adapters with a merged event stream
#[derive(Debug)]
pub struct NetworkAdapterRegistry {
    adapters: Vec<Arc<dyn NetworkAdapter>>,
    forwarders: Vec<JoinHandle<()>>,
    sender: broadcast::Sender<AdapterEvent>,
}

impl Default for NetworkAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkAdapterRegistry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            adapters: Vec::new(),
            forwarders: Vec::new(),
            sender,
        }
    }

    /// Register `adapter` and start forwarding its events. Returns its
    /// index.
    pub fn add(&mut self, adapter: Arc<dyn NetworkAdapter>) -> Result<usize, NetworkError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| NetworkError::NoRuntime)?;
        let index = self.adapters.len();
        let mut events = adapter.subscribe();
        let sender = self.sender.clone();
        let name = adapter.name().to_string();

        let forwarder = runtime.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        // No subscribers is fine.
                        let _ = sender.send(AdapterEvent { index, event });
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("Adapter {index} ({name}): dropped {missed} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        log::info!("Registered network adapter {index}: {}", adapter.name());
        self.adapters.push(adapter);
        self.forwarders.push(forwarder);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn NetworkAdapter>> {
        self.adapters.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn NetworkAdapter>> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// First adapter that reports a connection.
    pub fn primary(&self) -> Option<&Arc<dyn NetworkAdapter>> {
        self.adapters.iter().find(|a| a.is_connected())
    }

    /// Events from every registered adapter.
    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.sender.subscribe()
    }
}

impl Drop for NetworkAdapterRegistry {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}
