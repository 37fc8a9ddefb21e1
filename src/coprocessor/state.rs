//! Connection state machine.
//!
//! Everything here is synchronous and free of I/O. The adapter keeps a
//! [`Session`] behind a lock and replaces it with the one returned by
//! [`apply`] or by the `begin_*`/`complete_*` helpers, then publishes the
//! returned events after the lock is released.

use crate::coprocessor::protocol::{
    AuthenticationMode, ConnectEventData, DecodeError, EventFrame, StatusCode, WiFiFunction,
};
use crate::coprocessor::CoprocessorError;

/// Connection state of the WiFi adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WiFiState {
    #[default]
    Unknown,
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

/// Network the adapter is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDetails {
    pub ssid: String,
    pub bssid: [u8; 6],
    pub channel: u8,
    pub authentication: AuthenticationMode,
}

impl From<ConnectEventData> for ConnectionDetails {
    fn from(data: ConnectEventData) -> Self {
        Self {
            ssid: data.ssid,
            bssid: data.bssid,
            channel: data.channel,
            authentication: data.authentication,
        }
    }
}

/// Notifications produced by state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiFiEvent {
    NetworkConnected(ConnectionDetails),
    NetworkDisconnected,
    NetworkError(StatusCode),
    InterfaceStarted(StatusCode),
    InterfaceStopped(StatusCode),
    NtpTimeChanged,
}

/// Connection state plus the details cached for the current network
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub state: WiFiState,
    pub details: Option<ConnectionDetails>,
    pub last_status: Option<StatusCode>,
}

/// A new session and the notifications to publish for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub events: Vec<WiFiEvent>,
}

impl Transition {
    fn quiet(session: Session) -> Self {
        Self {
            session,
            events: Vec::new(),
        }
    }
}

impl Session {
    pub fn ssid(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.ssid.as_str())
    }

    pub fn bssid(&self) -> Option<[u8; 6]> {
        self.details.as_ref().map(|d| d.bssid)
    }

    pub fn channel(&self) -> u8 {
        self.details.as_ref().map_or(0, |d| d.channel)
    }

    /// Enter `Connecting` with the cached details cleared.
    pub fn begin_connect(&self) -> Result<Session, CoprocessorError> {
        match self.state {
            WiFiState::Connecting | WiFiState::Disconnecting => {
                Err(CoprocessorError::StateConflict { state: self.state })
            }
            _ => Ok(Session {
                state: WiFiState::Connecting,
                details: None,
                last_status: None,
            }),
        }
    }

    /// Undo [`Session::begin_connect`] when the request never reached the
    /// coprocessor.
    pub fn abort_connect(&self) -> Session {
        let mut next = self.clone();
        if next.state == WiFiState::Connecting {
            next.state = WiFiState::Disconnected;
        }
        next
    }

    pub fn begin_disconnect(&self) -> Result<Session, CoprocessorError> {
        match self.state {
            WiFiState::Disconnecting => Err(CoprocessorError::StateConflict { state: self.state }),
            _ => Ok(Session {
                state: WiFiState::Disconnecting,
                ..self.clone()
            }),
        }
    }

    /// Finish a disconnect request. `prior` is the state before
    /// [`Session::begin_disconnect`]. Events that arrived in the meantime
    /// take precedence.
    pub fn complete_disconnect(&self, prior: WiFiState, status: StatusCode) -> Transition {
        if self.state != WiFiState::Disconnecting {
            return Transition::quiet(self.clone());
        }
        if !status.is_ok() {
            return Transition::quiet(Session {
                state: prior,
                ..self.clone()
            });
        }

        let next = Session {
            state: WiFiState::Disconnected,
            details: None,
            last_status: self.last_status,
        };
        let events = if prior == WiFiState::Connected {
            vec![WiFiEvent::NetworkDisconnected]
        } else {
            Vec::new()
        };
        Transition {
            session: next,
            events,
        }
    }

    /// Record a non-success status and enter `Error`.
    pub fn record_failure(&self, status: StatusCode) -> Transition {
        let events = if self.state != WiFiState::Error {
            vec![WiFiEvent::NetworkError(status)]
        } else {
            Vec::new()
        };
        Transition {
            session: Session {
                state: WiFiState::Error,
                details: self.details.clone(),
                last_status: Some(status),
            },
            events,
        }
    }

    fn enter(&self, state: WiFiState, details: Option<ConnectionDetails>) -> Session {
        Session {
            state,
            details,
            last_status: self.last_status,
        }
    }
}

/// Apply one inbound event.
///
/// A payload that fails to decode leaves the caller's session untouched.
pub fn apply(session: &Session, event: &EventFrame) -> Result<Transition, DecodeError> {
    if !event.status.is_ok() {
        log::debug!("WiFi function {:?} returned {}", event.function, event.status);
        return Ok(session.record_failure(event.status));
    }

    let transition = match event.function {
        WiFiFunction::ConnectToAccessPointEvent => {
            let details = ConnectionDetails::from(ConnectEventData::decode(&event.payload)?);
            let events = if session.state != WiFiState::Connected {
                vec![WiFiEvent::NetworkConnected(details.clone())]
            } else {
                Vec::new()
            };
            Transition {
                session: session.enter(WiFiState::Connected, Some(details)),
                events,
            }
        }
        WiFiFunction::DisconnectFromAccessPointEvent => {
            let events = if session.state != WiFiState::Disconnected {
                vec![WiFiEvent::NetworkDisconnected]
            } else {
                Vec::new()
            };
            Transition {
                session: session.enter(WiFiState::Disconnected, None),
                events,
            }
        }
        WiFiFunction::StartWiFiInterfaceEvent => Transition {
            session: session.clone(),
            events: vec![WiFiEvent::InterfaceStarted(event.status)],
        },
        WiFiFunction::StopWiFiInterfaceEvent => Transition {
            session: session.clone(),
            events: vec![WiFiEvent::InterfaceStopped(event.status)],
        },
        WiFiFunction::NtpUpdateEvent => Transition {
            session: session.clone(),
            events: vec![WiFiEvent::NtpTimeChanged],
        },
        other => return Err(DecodeError::UnknownEvent(other as u32)),
    };
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn connected_event(ssid: &str) -> EventFrame {
        let data = ConnectEventData {
            ssid: ssid.to_string(),
            bssid: [1, 2, 3, 4, 5, 6],
            channel: 11,
            authentication: AuthenticationMode::Wpa2Psk,
        };
        EventFrame::new(
            WiFiFunction::ConnectToAccessPointEvent,
            StatusCode::CompletedOk,
            data.encode(),
        )
    }

    fn connecting() -> Session {
        Session::default().begin_connect().unwrap()
    }

    #[test]
    fn test_connected_event_sets_details_once() {
        let first = apply(&connecting(), &connected_event("lab")).unwrap();
        assert_eq!(first.session.state, WiFiState::Connected);
        assert_eq!(first.session.ssid(), Some("lab"));
        assert_eq!(first.session.channel(), 11);
        assert_eq!(first.events.len(), 1);

        let again = apply(&first.session, &connected_event("lab")).unwrap();
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_failure_status_enters_error_from_any_state() {
        let event = EventFrame::new(
            WiFiFunction::StartWiFiInterfaceEvent,
            StatusCode::AuthenticationFailed,
            Bytes::new(),
        );
        let t = apply(&connecting(), &event).unwrap();
        assert_eq!(t.session.state, WiFiState::Error);
        assert_eq!(t.session.last_status, Some(StatusCode::AuthenticationFailed));
        assert_eq!(
            t.events,
            vec![WiFiEvent::NetworkError(StatusCode::AuthenticationFailed)]
        );
    }

    #[test]
    fn test_disconnected_event_clears_details() {
        let connected = apply(&connecting(), &connected_event("lab")).unwrap().session;
        let event = EventFrame::new(
            WiFiFunction::DisconnectFromAccessPointEvent,
            StatusCode::CompletedOk,
            Bytes::new(),
        );
        let t = apply(&connected, &event).unwrap();
        assert_eq!(t.session.state, WiFiState::Disconnected);
        assert_eq!(t.session.details, None);
        assert_eq!(t.events, vec![WiFiEvent::NetworkDisconnected]);
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        let event = EventFrame::new(
            WiFiFunction::ConnectToAccessPointEvent,
            StatusCode::CompletedOk,
            Bytes::from_static(&[9, 0]),
        );
        assert!(apply(&connecting(), &event).is_err());
    }

    #[test]
    fn test_connect_rejected_while_busy() {
        let busy = connecting();
        assert_eq!(
            busy.begin_connect(),
            Err(CoprocessorError::StateConflict {
                state: WiFiState::Connecting
            })
        );
        let disconnecting = Session::default().begin_disconnect().unwrap();
        assert!(disconnecting.begin_connect().is_err());
        assert!(disconnecting.begin_disconnect().is_err());
    }

    #[test]
    fn test_disconnect_completion() {
        let connected = apply(&connecting(), &connected_event("lab")).unwrap().session;
        let pending = connected.begin_disconnect().unwrap();

        let failed = pending.complete_disconnect(WiFiState::Connected, StatusCode::Failure);
        assert_eq!(failed.session.state, WiFiState::Connected);
        assert!(failed.events.is_empty());

        let done = pending.complete_disconnect(WiFiState::Connected, StatusCode::CompletedOk);
        assert_eq!(done.session.state, WiFiState::Disconnected);
        assert_eq!(done.session.ssid(), None);
        assert_eq!(done.events, vec![WiFiEvent::NetworkDisconnected]);
    }
}
