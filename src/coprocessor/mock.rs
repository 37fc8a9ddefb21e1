//! Mock coprocessor for testing
//!
//! [`MockCoprocessor`] answers commands from per-function response queues
//! (an empty queue answers `CompletedOk` with no payload), serves queued
//! events to the event pump, and can delay or fail individual functions.
//! Delays use the tokio clock, so tests on a paused clock stay instant.

use crate::bus::BusError;
use crate::coprocessor::protocol::{Command, EventFrame, Interface, Response, WiFiFunction};
use crate::coprocessor::transport::CoprocessorTransport;
use crate::coprocessor::CoprocessorError;
use crate::util::lock;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<WiFiFunction, VecDeque<Response>>,
    delays: HashMap<WiFiFunction, Duration>,
    failures: HashMap<WiFiFunction, VecDeque<BusError>>,
    events: VecDeque<EventFrame>,
    commands: Vec<Command>,
}

/// Scripted stand-in for the ESP32
#[derive(Debug, Default)]
pub struct MockCoprocessor {
    state: Mutex<MockState>,
}

impl MockCoprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response for `function`.
    pub fn respond(&self, function: WiFiFunction, response: Response) {
        lock(&self.state)
            .responses
            .entry(function)
            .or_default()
            .push_back(response);
    }

    /// Hold every `function` command for `delay` before answering.
    pub fn set_delay(&self, function: WiFiFunction, delay: Duration) {
        lock(&self.state).delays.insert(function, delay);
    }

    /// Fail the next `function` command at the bus level.
    pub fn fail_next(&self, function: WiFiFunction, error: BusError) {
        lock(&self.state)
            .failures
            .entry(function)
            .or_default()
            .push_back(error);
    }

    /// Make an event available to the next poll.
    pub fn push_event(&self, event: EventFrame) {
        lock(&self.state).events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        lock(&self.state).events.len()
    }

    /// WiFi commands received so far. Event polls are not recorded.
    pub fn commands(&self) -> Vec<Command> {
        lock(&self.state).commands.clone()
    }

    pub fn commands_for(&self, function: WiFiFunction) -> Vec<Command> {
        lock(&self.state)
            .commands
            .iter()
            .filter(|c| c.wifi_function() == Some(function))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CoprocessorTransport for MockCoprocessor {
    async fn send(&self, command: Command) -> Result<Response, CoprocessorError> {
        if command.interface == Interface::System {
            let event = lock(&self.state).events.pop_front();
            return Ok(Response::ok(event.map(|e| e.encode()).unwrap_or_default()));
        }

        let Some(function) = command.wifi_function() else {
            return Ok(Response::new(
                crate::coprocessor::StatusCode::InvalidFunction,
                Bytes::new(),
            ));
        };

        let delay = {
            let mut state = lock(&self.state);
            state.commands.push(command);
            state.delays.get(&function).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        if let Some(error) = state.failures.get_mut(&function).and_then(VecDeque::pop_front) {
            return Err(error.into());
        }
        Ok(state
            .responses
            .get_mut(&function)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Response::ok(Bytes::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coprocessor::StatusCode;

    #[tokio::test]
    async fn test_scripted_then_default_response() {
        let mock = MockCoprocessor::new();
        mock.respond(
            WiFiFunction::StartWiFiInterface,
            Response::new(StatusCode::Failure, Bytes::new()),
        );

        let first = mock
            .send(Command::wifi(WiFiFunction::StartWiFiInterface, Vec::new()))
            .await
            .unwrap();
        assert_eq!(first.status, StatusCode::Failure);

        let second = mock
            .send(Command::wifi(WiFiFunction::StartWiFiInterface, Vec::new()))
            .await
            .unwrap();
        assert!(second.status.is_ok());
        assert_eq!(mock.commands_for(WiFiFunction::StartWiFiInterface).len(), 2);
    }

    #[tokio::test]
    async fn test_poll_serves_events_in_order() {
        let mock = MockCoprocessor::new();
        mock.push_event(EventFrame::new(
            WiFiFunction::StartWiFiInterfaceEvent,
            StatusCode::CompletedOk,
            Bytes::new(),
        ));
        mock.push_event(EventFrame::new(
            WiFiFunction::NtpUpdateEvent,
            StatusCode::CompletedOk,
            Bytes::new(),
        ));

        let first = mock.poll_event().await.unwrap().unwrap();
        let second = mock.poll_event().await.unwrap().unwrap();
        assert_eq!(first.function, WiFiFunction::StartWiFiInterfaceEvent);
        assert_eq!(second.function, WiFiFunction::NtpUpdateEvent);
        assert_eq!(mock.poll_event().await.unwrap(), None);
        assert!(mock.commands().is_empty());
    }
}
