//! Coprocessor transports and the inbound event pump.
//!
//! A transport sends one [`Command`] and returns the coprocessor's
//! [`Response`]. The SPI transport runs the blocking bus transfer on the
//! blocking pool so the async callers are never stalled by the bus lock.

use crate::bus::{BusError, ChipSelectMode, SpiBus};
use crate::cancel::CancelToken;
use crate::constants::MAXIMUM_SPI_BUFFER_LENGTH;
use crate::coprocessor::protocol::{
    Command, EventFrame, Response, ResponseHeader, COMMAND_HEADER_LENGTH, RESPONSE_HEADER_LENGTH,
};
use crate::coprocessor::CoprocessorError;
use crate::log_warn_throttled;
use crate::ports::DigitalOutputPort;
use crate::util::{log_frame_hex, LogThrottle};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Link to the coprocessor
#[async_trait]
pub trait CoprocessorTransport: Send + Sync + fmt::Debug {
    /// Send one command and wait for its response.
    async fn send(&self, command: Command) -> Result<Response, CoprocessorError>;

    /// Fetch the oldest pending event. `Ok(None)` when nothing is queued.
    async fn poll_event(&self) -> Result<Option<EventFrame>, CoprocessorError> {
        let response = self.send(Command::poll_event()).await?;
        if !response.status.is_ok() {
            return Err(CoprocessorError::Status {
                operation: "event poll",
                status: response.status,
            });
        }
        if response.payload.is_empty() {
            return Ok(None);
        }
        Ok(Some(EventFrame::decode(&response.payload)?))
    }
}

/// Coprocessor reached over a four-wire bus with its own chip select
pub struct SpiCoprocessorTransport {
    bus: Arc<SpiBus>,
    chip_select: Arc<DigitalOutputPort>,
    mode: ChipSelectMode,
}

impl fmt::Debug for SpiCoprocessorTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiCoprocessorTransport")
            .field("chip_select", &self.chip_select.pin().name())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl SpiCoprocessorTransport {
    pub fn new(bus: Arc<SpiBus>, chip_select: Arc<DigitalOutputPort>) -> Self {
        Self {
            bus,
            chip_select,
            mode: ChipSelectMode::ActiveLow,
        }
    }

    pub fn with_chip_select_mode(mut self, mode: ChipSelectMode) -> Self {
        self.mode = mode;
        self
    }

    /// Write `frame`, then clock in the response header and payload, all
    /// under one chip-select assertion.
    fn exchange(
        bus: &SpiBus,
        chip_select: &DigitalOutputPort,
        mode: ChipSelectMode,
        frame: &[u8],
    ) -> Result<Response, CoprocessorError> {
        let (header, payload) = bus.transaction(Some(chip_select), mode, |t| {
            t.write(frame)?;
            let mut header = [0u8; RESPONSE_HEADER_LENGTH];
            t.read(&mut header)?;

            let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
            let mut payload = Vec::new();
            if length > 0 && length <= MAXIMUM_SPI_BUFFER_LENGTH {
                payload.resize(length, 0);
                t.read(&mut payload)?;
            }
            Ok::<_, BusError>((header, payload))
        })?;

        // Rejects the oversized lengths skipped above.
        let header = ResponseHeader::decode(&header)?;
        Ok(Response::new(header.status, payload))
    }
}

#[async_trait]
impl CoprocessorTransport for SpiCoprocessorTransport {
    async fn send(&self, command: Command) -> Result<Response, CoprocessorError> {
        let frame = command.encode();
        // Header only, payloads may hold credentials.
        log_frame_hex("coprocessor tx", &frame[..COMMAND_HEADER_LENGTH]);

        let bus = Arc::clone(&self.bus);
        let chip_select = Arc::clone(&self.chip_select);
        let mode = self.mode;
        let response = tokio::task::spawn_blocking(move || {
            Self::exchange(&bus, &chip_select, mode, &frame)
        })
        .await
        .map_err(|e| CoprocessorError::TaskFailed(e.to_string()))??;

        log_frame_hex("coprocessor rx", &response.payload);
        Ok(response)
    }
}

/// Poll `transport` for events and forward them to `events` in arrival
/// order until `cancel` is raised or the receiver is dropped.
///
/// Queued events are drained back to back; the pump only sleeps for
/// `poll_interval` when the coprocessor reports nothing pending or the
/// poll fails.
pub async fn event_pump(
    transport: Arc<dyn CoprocessorTransport>,
    events: mpsc::Sender<EventFrame>,
    poll_interval: Duration,
    cancel: CancelToken,
) {
    log::debug!("Coprocessor event pump started");
    let mut throttle = LogThrottle::new(10_000, 3);

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = transport.poll_event() => polled,
        };

        match polled {
            Ok(Some(event)) => {
                log::trace!("Coprocessor event {:?} ({})", event.function, event.status);
                if events.send(event).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                log_warn_throttled!(throttle, "Coprocessor event poll failed: {}", e);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
    log::debug!("Coprocessor event pump stopped");
}
