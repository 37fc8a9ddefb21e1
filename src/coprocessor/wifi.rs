//! # ESP32 WiFi Adapter
//!
//! [`Esp32WiFiAdapter`] drives the coprocessor's WiFi interface. Commands
//! are sent through a [`CoprocessorTransport`]; completion arrives later as
//! events, which a dispatch task applies to the shared [`Session`] one at a
//! time and in order.
//!
//! ## Connecting
//!
//! `connect` validates its arguments, clears the cached network details,
//! enters `Connecting` and sends the credentials. It then re-checks the
//! session every poll interval until an event moves it out of
//! `Connecting`, the timeout expires or the cancel token is raised. The
//! deadline and the token are also watched while the request is in flight. A
//! timeout or cancellation leaves the session in `Connecting` and sends
//! nothing to the coprocessor, so a late "connected" event still completes
//! the attempt.
//!
//! ## Scanning
//!
//! The access point list command runs in its own task. If the timeout
//! expires or the cancel token is raised first, the caller gets
//! [`CoprocessorError::Timeout`] or [`CoprocessorError::Cancelled`] and the
//! task's result is discarded when it eventually completes.

use crate::cancel::CancelToken;
use crate::config::WiFiConfig;
use crate::constants::*;
use crate::coprocessor::protocol::{
    decode_access_point_list, encode_disconnect_request, encode_set_antenna_request, AntennaType,
    AuthenticationMode, Command, EventFrame, StatusCode, WiFiCredentials, WiFiFunction,
    WiFiNetwork,
};
use crate::coprocessor::state::{self, Session, Transition, WiFiEvent, WiFiState};
use crate::coprocessor::transport::{event_pump, CoprocessorTransport};
use crate::coprocessor::CoprocessorError;
use crate::log_warn_throttled;
use crate::network::{NetworkAdapter, NetworkEvent};
use crate::util::{lock, parse_mac_address, LogThrottle};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Outcome of a disconnect request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Success,
    UnspecifiedFailure,
    WiFiNotStarted,
}

impl From<StatusCode> for ConnectionStatus {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::CompletedOk => ConnectionStatus::Success,
            StatusCode::EspWiFiNotStarted => ConnectionStatus::WiFiNotStarted,
            _ => ConnectionStatus::UnspecifiedFailure,
        }
    }
}

impl WiFiEvent {
    fn to_network_event(&self) -> Option<NetworkEvent> {
        match self {
            WiFiEvent::NetworkConnected(_) => Some(NetworkEvent::Connected),
            WiFiEvent::NetworkDisconnected => Some(NetworkEvent::Disconnected),
            WiFiEvent::NetworkError(status) => Some(NetworkEvent::Error(status.to_string())),
            _ => None,
        }
    }
}

/// Session and notification channels shared with the dispatch task
#[derive(Debug)]
struct Shared {
    session: Mutex<Session>,
    wifi_events: broadcast::Sender<WiFiEvent>,
    network_events: broadcast::Sender<NetworkEvent>,
}

impl Shared {
    /// Replace the session under its lock, then publish the events.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&Session) -> Transition,
    {
        let events = {
            let mut session = lock(&self.session);
            let Transition {
                session: next,
                events,
            } = f(&session);
            *session = next;
            events
        };
        self.publish(events);
    }

    fn publish(&self, events: Vec<WiFiEvent>) {
        for event in events {
            if let Some(network) = event.to_network_event() {
                let _ = self.network_events.send(network);
            }
            let _ = self.wifi_events.send(event);
        }
    }

    fn snapshot(&self) -> Session {
        lock(&self.session).clone()
    }

    async fn dispatch(self: Arc<Self>, mut events: mpsc::Receiver<EventFrame>) {
        let mut throttle = LogThrottle::new(10_000, 3);
        while let Some(event) = events.recv().await {
            let outcome = {
                let mut session = lock(&self.session);
                state::apply(&session, &event).map(|t| {
                    *session = t.session;
                    t.events
                })
            };
            match outcome {
                Ok(published) => self.publish(published),
                Err(e) => {
                    log_warn_throttled!(throttle, "Dropping coprocessor event {:?}: {}", event.function, e);
                }
            }
        }
        log::debug!("Coprocessor event dispatch stopped");
    }
}

/// Mutable settings mirrored from [`WiFiConfig`]
#[derive(Debug)]
struct Settings {
    scan_period: Duration,
    maximum_retry_count: u32,
    antenna: AntennaType,
}

/// WiFi network adapter backed by the ESP32 coprocessor
#[derive(Debug)]
pub struct Esp32WiFiAdapter {
    transport: Arc<dyn CoprocessorTransport>,
    shared: Arc<Shared>,
    config: WiFiConfig,
    settings: Mutex<Settings>,
    mac_address: OnceCell<Option<[u8; 6]>>,
    soft_ap_mac_address: OnceCell<Option<[u8; 6]>>,
    poll_interval: Duration,
    cancel: CancelToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Esp32WiFiAdapter {
    /// Create the adapter and start polling `transport` for events.
    pub fn new(
        transport: Arc<dyn CoprocessorTransport>,
        config: WiFiConfig,
    ) -> Result<Self, CoprocessorError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| CoprocessorError::NoRuntime)?;
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut adapter = Self::with_event_channel(transport, config, receiver)?;
        let pump = runtime.spawn(event_pump(
            Arc::clone(&adapter.transport),
            sender,
            EVENT_POLL_INTERVAL,
            adapter.cancel.clone(),
        ));
        adapter.tasks.push(pump);
        Ok(adapter)
    }

    /// Create the adapter fed by an existing event channel instead of the
    /// built-in pump.
    pub fn with_event_channel(
        transport: Arc<dyn CoprocessorTransport>,
        config: WiFiConfig,
        events: mpsc::Receiver<EventFrame>,
    ) -> Result<Self, CoprocessorError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| CoprocessorError::NoRuntime)?;
        let scan_period = config.scan_period();
        if !(MINIMUM_SCAN_PERIOD..=MAXIMUM_SCAN_PERIOD).contains(&scan_period) {
            return Err(CoprocessorError::InvalidArgument(format!(
                "scan period should be between {MINIMUM_SCAN_PERIOD:?} and {MAXIMUM_SCAN_PERIOD:?} (inclusive), got {scan_period:?}"
            )));
        }

        let (wifi_events, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let (network_events, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            session: Mutex::new(Session::default()),
            wifi_events,
            network_events,
        });
        let dispatch = runtime.spawn(Arc::clone(&shared).dispatch(events));

        let poll_interval = config.connect_poll_interval().max(Duration::from_millis(1));
        let settings = Settings {
            scan_period,
            maximum_retry_count: config.maximum_retry_count.max(MINIMUM_RETRY_COUNT),
            antenna: AntennaType::NotKnown,
        };

        Ok(Self {
            transport,
            shared,
            config,
            settings: Mutex::new(settings),
            mac_address: OnceCell::new(),
            soft_ap_mac_address: OnceCell::new(),
            poll_interval,
            cancel: CancelToken::new(),
            tasks: vec![dispatch],
        })
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Connect to `ssid`. A zero `timeout` waits indefinitely.
    pub async fn connect(
        &self,
        ssid: &str,
        password: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), CoprocessorError> {
        if ssid.is_empty() {
            return Err(CoprocessorError::InvalidArgument("invalid SSID".to_string()));
        }
        if cancel.is_cancelled() {
            return Err(CoprocessorError::Cancelled);
        }

        {
            let mut session = lock(&self.shared.session);
            *session = session.begin_connect()?;
        }

        let credentials = WiFiCredentials::new(ssid, password);
        let command = Command::wifi(WiFiFunction::ConnectToAccessPoint, credentials.encode().to_vec());
        log::info!("Connecting to {ssid}");

        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let sent = tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("Connection to {ssid} cancelled while sending");
                return Err(CoprocessorError::Cancelled);
            }
            _ = sleep_until(deadline) => {
                log::warn!("Connection to {ssid} timed out after {timeout:?}");
                return Err(CoprocessorError::Timeout(timeout));
            }
            sent = self.transport.send(command) => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let mut session = lock(&self.shared.session);
                *session = session.abort_connect();
                return Err(e);
            }
        };
        if !response.status.is_ok() {
            self.shared.update(|s| s.record_failure(response.status));
            return Err(CoprocessorError::ConnectionFailed {
                status: response.status,
            });
        }

        loop {
            let session = self.shared.snapshot();
            match session.state {
                WiFiState::Connecting => {}
                WiFiState::Connected => {
                    log::info!("Connected to {ssid}");
                    return Ok(());
                }
                WiFiState::Error => {
                    return Err(CoprocessorError::ConnectionFailed {
                        status: session.last_status.unwrap_or(StatusCode::Failure),
                    })
                }
                other => return Err(CoprocessorError::NotConnected { state: other }),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Connection to {ssid} cancelled");
                    return Err(CoprocessorError::Cancelled);
                }
                _ = sleep_until(deadline) => {
                    log::warn!("Connection to {ssid} timed out after {timeout:?}");
                    return Err(CoprocessorError::Timeout(timeout));
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Disconnect from the current access point, optionally stopping the
    /// WiFi interface as well.
    pub async fn disconnect(
        &self,
        turn_off_interface: bool,
    ) -> Result<ConnectionStatus, CoprocessorError> {
        let prior = {
            let mut session = lock(&self.shared.session);
            let prior = session.state;
            *session = session.begin_disconnect()?;
            prior
        };

        let command = Command::wifi(
            WiFiFunction::DisconnectFromAccessPoint,
            encode_disconnect_request(turn_off_interface),
        );
        match self.transport.send(command).await {
            Ok(response) => {
                self.shared
                    .update(|s| s.complete_disconnect(prior, response.status));
                Ok(ConnectionStatus::from(response.status))
            }
            Err(e) => {
                self.shared
                    .update(|s| s.complete_disconnect(prior, StatusCode::Failure));
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------

    /// List nearby access points. A zero `timeout` waits indefinitely.
    pub async fn scan(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<WiFiNetwork>, CoprocessorError> {
        if cancel.is_cancelled() {
            return Err(CoprocessorError::Cancelled);
        }

        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let transport = Arc::clone(&self.transport);
        let task = tokio::spawn(async move {
            transport
                .send(Command::wifi(WiFiFunction::GetAccessPoints, Vec::new()))
                .await
        });

        // Leaving early drops the handle; the request runs to completion
        // and its result is discarded.
        let joined = tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("Access point scan cancelled");
                return Err(CoprocessorError::Cancelled);
            }
            _ = sleep_until(deadline) => {
                log::warn!("Access point scan timed out after {timeout:?}");
                return Err(CoprocessorError::Timeout(timeout));
            }
            joined = task => joined,
        };

        let response = joined.map_err(|e| CoprocessorError::TaskFailed(e.to_string()))??;
        if !response.status.is_ok() {
            log::warn!("Error getting access points: {}", response.status);
            return Err(CoprocessorError::Status {
                operation: "access point scan",
                status: response.status,
            });
        }
        let networks = decode_access_point_list(&response.payload)?;
        log::debug!("Scan found {} access points", networks.len());
        Ok(networks)
    }

    // ------------------------------------------------------------------
    // Interface and radio
    // ------------------------------------------------------------------

    pub async fn start_interface(&self) -> Result<(), CoprocessorError> {
        self.simple_command(WiFiFunction::StartWiFiInterface, "start interface")
            .await
    }

    /// Stop the interface and release its resources on the coprocessor.
    pub async fn stop_interface(&self) -> Result<(), CoprocessorError> {
        self.simple_command(WiFiFunction::StopWiFiInterface, "stop interface")
            .await
    }

    async fn simple_command(
        &self,
        function: WiFiFunction,
        operation: &'static str,
    ) -> Result<(), CoprocessorError> {
        let response = self.transport.send(Command::wifi(function, Vec::new())).await?;
        if !response.status.is_ok() {
            return Err(CoprocessorError::Status {
                operation,
                status: response.status,
            });
        }
        Ok(())
    }

    /// Select the antenna. The cached setting changes only once the
    /// coprocessor has accepted the request.
    pub async fn set_antenna(
        &self,
        antenna: AntennaType,
        persist: bool,
    ) -> Result<(), CoprocessorError> {
        let payload =
            encode_set_antenna_request(antenna, persist).ok_or(CoprocessorError::InvalidAntenna)?;
        let response = self
            .transport
            .send(Command::wifi(WiFiFunction::SetAntenna, payload))
            .await?;
        if !response.status.is_ok() {
            return Err(CoprocessorError::Status {
                operation: "antenna change",
                status: response.status,
            });
        }
        lock(&self.settings).antenna = antenna;
        log::info!("Antenna set to {antenna:?} (persist: {persist})");
        Ok(())
    }

    pub fn current_antenna(&self) -> AntennaType {
        lock(&self.settings).antenna
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn scan_period(&self) -> Duration {
        lock(&self.settings).scan_period
    }

    /// Must lie within 1 s to 60 s inclusive.
    pub fn set_scan_period(&self, period: Duration) -> Result<(), CoprocessorError> {
        if !(MINIMUM_SCAN_PERIOD..=MAXIMUM_SCAN_PERIOD).contains(&period) {
            return Err(CoprocessorError::InvalidArgument(format!(
                "scan period should be between {MINIMUM_SCAN_PERIOD:?} and {MAXIMUM_SCAN_PERIOD:?} (inclusive), got {period:?}"
            )));
        }
        lock(&self.settings).scan_period = period;
        Ok(())
    }

    pub fn maximum_retry_count(&self) -> u32 {
        lock(&self.settings).maximum_retry_count
    }

    /// Values below the minimum of 3 are raised to it.
    pub fn set_maximum_retry_count(&self, count: u32) {
        let effective = count.max(MINIMUM_RETRY_COUNT);
        if effective != count {
            log::warn!("Retry count {count} raised to {effective}");
        }
        lock(&self.settings).maximum_retry_count = effective;
    }

    pub fn auto_connect(&self) -> bool {
        self.config.auto_connect
    }

    pub fn auto_reconnect(&self) -> bool {
        self.config.auto_reconnect
    }

    pub fn default_ssid(&self) -> Option<&str> {
        self.config.default_ssid.as_deref()
    }

    /// Station MAC address, resolved on first use.
    pub fn mac_address(&self) -> Option<[u8; 6]> {
        *self
            .mac_address
            .get_or_init(|| resolve_mac("station", self.config.mac_address.as_deref()))
    }

    /// Soft access point MAC address, resolved on first use.
    pub fn soft_ap_mac_address(&self) -> Option<[u8; 6]> {
        *self.soft_ap_mac_address.get_or_init(|| {
            resolve_mac("soft AP", self.config.soft_ap_mac_address.as_deref())
        })
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn state(&self) -> WiFiState {
        lock(&self.shared.session).state
    }

    pub fn session(&self) -> Session {
        self.shared.snapshot()
    }

    /// Status of the last failed operation or event.
    pub fn last_status(&self) -> Option<StatusCode> {
        lock(&self.shared.session).last_status
    }

    pub fn ssid(&self) -> Option<String> {
        lock(&self.shared.session).ssid().map(str::to_string)
    }

    pub fn bssid(&self) -> Option<[u8; 6]> {
        lock(&self.shared.session).bssid()
    }

    pub fn channel(&self) -> u8 {
        lock(&self.shared.session).channel()
    }

    pub fn authentication(&self) -> Option<AuthenticationMode> {
        lock(&self.shared.session)
            .details
            .as_ref()
            .map(|d| d.authentication)
    }

    pub fn has_internet_access(&self) -> bool {
        self.state() == WiFiState::Connected
    }

    /// Every adapter event, including interface and NTP notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<WiFiEvent> {
        self.shared.wifi_events.subscribe()
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn resolve_mac(label: &str, text: Option<&str>) -> Option<[u8; 6]> {
    let text = text?;
    match parse_mac_address(text) {
        Ok(mac) => Some(mac),
        Err(e) => {
            log::warn!("Ignoring {label} MAC address {text:?}: {e}");
            None
        }
    }
}

impl NetworkAdapter for Esp32WiFiAdapter {
    fn name(&self) -> &str {
        "esp32-wifi"
    }

    fn is_connected(&self) -> bool {
        self.has_internet_access()
    }

    fn mac_address(&self) -> Option<[u8; 6]> {
        Esp32WiFiAdapter::mac_address(self)
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.shared.network_events.subscribe()
    }
}

impl Drop for Esp32WiFiAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_mapping() {
        assert_eq!(
            ConnectionStatus::from(StatusCode::CompletedOk),
            ConnectionStatus::Success
        );
        assert_eq!(
            ConnectionStatus::from(StatusCode::EspWiFiNotStarted),
            ConnectionStatus::WiFiNotStarted
        );
        assert_eq!(
            ConnectionStatus::from(StatusCode::Timeout),
            ConnectionStatus::UnspecifiedFailure
        );
    }

    #[test]
    fn test_bad_mac_is_ignored() {
        assert_eq!(resolve_mac("station", Some("zz:00")), None);
        assert_eq!(
            resolve_mac("station", Some("24:0A:C4:00:01:10")),
            Some([0x24, 0x0A, 0xC4, 0x00, 0x01, 0x10])
        );
    }
}
