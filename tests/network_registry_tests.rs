//! Registry tests with a hand-driven adapter.

use periph_hal::network::{NetworkAdapter, NetworkAdapterRegistry, NetworkError, NetworkEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug)]
struct FakeAdapter {
    name: &'static str,
    connected: AtomicBool,
    events: broadcast::Sender<NetworkEvent>,
}

impl FakeAdapter {
    fn new(name: &'static str) -> Arc<Self> {
        let (events, _) = broadcast::channel(8);
        Arc::new(Self {
            name,
            connected: AtomicBool::new(false),
            events,
        })
    }

    fn raise(&self, event: NetworkEvent) {
        self.connected
            .store(event == NetworkEvent::Connected, Ordering::SeqCst);
        self.events.send(event).unwrap();
    }
}

impl NetworkAdapter for FakeAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn mac_address(&self) -> Option<[u8; 6]> {
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }
}

#[tokio::test]
async fn test_events_are_tagged_with_index() {
    let wired = FakeAdapter::new("ethernet");
    let wireless = FakeAdapter::new("wifi");
    let mut registry = NetworkAdapterRegistry::new();
    assert!(registry.is_empty());

    assert_eq!(registry.add(wired.clone()).unwrap(), 0);
    assert_eq!(registry.add(wireless.clone()).unwrap(), 1);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get(1).unwrap().name(), "wifi");

    let mut merged = registry.subscribe();
    wireless.raise(NetworkEvent::Connected);
    let event = merged.recv().await.unwrap();
    assert_eq!(event.index, 1);
    assert_eq!(event.event, NetworkEvent::Connected);

    wired.raise(NetworkEvent::Error("link down".to_string()));
    let event = merged.recv().await.unwrap();
    assert_eq!(event.index, 0);
    assert_eq!(event.event, NetworkEvent::Error("link down".to_string()));
}

#[tokio::test]
async fn test_primary_is_first_connected() {
    let first = FakeAdapter::new("a");
    let second = FakeAdapter::new("b");
    let mut registry = NetworkAdapterRegistry::default();
    registry.add(first.clone()).unwrap();
    registry.add(second.clone()).unwrap();

    assert!(registry.primary().is_none());
    second.raise(NetworkEvent::Connected);
    assert_eq!(registry.primary().unwrap().name(), "b");
    first.raise(NetworkEvent::Connected);
    assert_eq!(registry.primary().unwrap().name(), "a");
    assert_eq!(registry.iter().filter(|a| a.is_connected()).count(), 2);
}

#[test]
fn test_add_needs_runtime() {
    let mut registry = NetworkAdapterRegistry::new();
    assert_eq!(
        registry.add(FakeAdapter::new("a")),
        Err(NetworkError::NoRuntime)
    );
    assert!(registry.is_empty());
}
