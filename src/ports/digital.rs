//! # Digital Ports
//!
//! Output, input and bidirectional ports over GPIO-capable pins. Each port
//! configures its pin through the native layer when it is created and
//! unconfigures it when dropped.

use crate::constants::NOTIFICATION_CHANNEL_CAPACITY;
use crate::native::{GpioFlags, NativeOpcode, NativeTransport};
use crate::pins::{
    ChannelCapabilities, ChannelConfigurationType, Pin, PinArbiter, ReservationError,
};
use crate::ports::{gpio_call, PinClaim, PortError};
use crate::units::{ChangeResult, DigitalState};
use crate::util::lock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Upper bound for debounce and glitch filters
const MAX_FILTER_DURATION: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    PushPull,
    OpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResistorMode {
    #[default]
    Disabled,
    InternalPullUp,
    InternalPullDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptMode {
    #[default]
    None,
    EdgeRising,
    EdgeFalling,
    EdgeBoth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortDirection {
    #[default]
    Input,
    Output,
}

fn input_flags(resistor: ResistorMode, interrupt: InterruptMode) -> GpioFlags {
    let mut flags = GpioFlags::empty();
    match resistor {
        ResistorMode::Disabled => {}
        ResistorMode::InternalPullUp => flags |= GpioFlags::PULL_UP,
        ResistorMode::InternalPullDown => flags |= GpioFlags::PULL_DOWN,
    }
    match interrupt {
        InterruptMode::None => {}
        InterruptMode::EdgeRising => flags |= GpioFlags::INTERRUPT_RISING,
        InterruptMode::EdgeFalling => flags |= GpioFlags::INTERRUPT_FALLING,
        InterruptMode::EdgeBoth => {
            flags |= GpioFlags::INTERRUPT_RISING | GpioFlags::INTERRUPT_FALLING
        }
    }
    flags
}

fn output_flags(initial_state: bool, output_type: OutputType) -> GpioFlags {
    let mut flags = GpioFlags::OUTPUT;
    flags.set(GpioFlags::INITIAL_HIGH, initial_state);
    flags.set(GpioFlags::OPEN_DRAIN, output_type == OutputType::OpenDrain);
    flags
}

/// Debounce and glitch filters travel as two little-endian u16 milliseconds.
fn filter_payload(debounce: Duration, glitch: Duration) -> [u8; 4] {
    let d = (debounce.as_millis() as u16).to_le_bytes();
    let g = (glitch.as_millis() as u16).to_le_bytes();
    [d[0], d[1], g[0], g[1]]
}

fn check_filter(name: &'static str, value: Duration) -> Result<(), PortError> {
    if value > MAX_FILTER_DURATION {
        return Err(PortError::DurationOutOfRange { name, value });
    }
    Ok(())
}

fn unconfigure(transport: &dyn NativeTransport, pin: &Pin) {
    if let Err(e) = gpio_call(
        transport,
        pin,
        NativeOpcode::GpioUnconfigure,
        GpioFlags::empty(),
        &[],
        &mut [],
    ) {
        log::warn!("Failed to unconfigure {pin}: {e}");
    }
}

/// A pin driven high or low.
#[derive(Debug)]
pub struct DigitalOutputPort {
    claim: PinClaim,
    transport: Arc<dyn NativeTransport>,
    state: AtomicBool,
    output_type: OutputType,
}

impl DigitalOutputPort {
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        initial_state: bool,
        output_type: OutputType,
    ) -> Result<Self, PortError> {
        let claim = PinClaim::acquire(arbiter, pin, ChannelConfigurationType::DigitalOutput)?;
        gpio_call(
            transport.as_ref(),
            pin,
            NativeOpcode::GpioConfigure,
            output_flags(initial_state, output_type),
            &[],
            &mut [],
        )?;
        log::debug!("Digital output on {pin}, initial state {initial_state}");

        Ok(Self {
            claim,
            transport,
            state: AtomicBool::new(initial_state),
            output_type,
        })
    }

    pub fn pin(&self) -> &Pin {
        self.claim.pin()
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Last level written.
    pub fn state(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    pub fn set_state(&self, state: bool) -> Result<(), PortError> {
        gpio_call(
            self.transport.as_ref(),
            self.claim.pin(),
            NativeOpcode::GpioWrite,
            GpioFlags::empty(),
            &[u8::from(state)],
            &mut [],
        )?;
        self.state.store(state, Ordering::SeqCst);
        Ok(())
    }

    pub fn toggle(&self) -> Result<bool, PortError> {
        let next = !self.state();
        self.set_state(next)?;
        Ok(next)
    }
}

impl Drop for DigitalOutputPort {
    fn drop(&mut self) {
        unconfigure(self.transport.as_ref(), self.claim.pin());
    }
}

/// A pin sampled as a logic level.
#[derive(Debug)]
pub struct DigitalInputPort {
    claim: PinClaim,
    transport: Arc<dyn NativeTransport>,
    resistor_mode: ResistorMode,
}

impl DigitalInputPort {
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        resistor_mode: ResistorMode,
    ) -> Result<Self, PortError> {
        let claim = PinClaim::acquire(arbiter, pin, ChannelConfigurationType::DigitalInput)?;
        gpio_call(
            transport.as_ref(),
            pin,
            NativeOpcode::GpioConfigure,
            input_flags(resistor_mode, InterruptMode::None),
            &[],
            &mut [],
        )?;
        Ok(Self {
            claim,
            transport,
            resistor_mode,
        })
    }

    pub fn pin(&self) -> &Pin {
        self.claim.pin()
    }

    pub fn resistor_mode(&self) -> ResistorMode {
        self.resistor_mode
    }

    pub fn state(&self) -> Result<bool, PortError> {
        let mut level = [0u8; 1];
        gpio_call(
            self.transport.as_ref(),
            self.claim.pin(),
            NativeOpcode::GpioRead,
            GpioFlags::empty(),
            &[],
            &mut level,
        )?;
        Ok(level[0] != 0)
    }
}

impl Drop for DigitalInputPort {
    fn drop(&mut self) {
        unconfigure(self.transport.as_ref(), self.claim.pin());
    }
}

/// Construction options for [`BiDirectionalPort`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BiDirectionalConfig {
    pub initial_state: bool,
    pub interrupt_mode: InterruptMode,
    pub resistor_mode: ResistorMode,
    pub initial_direction: PortDirection,
    pub debounce: Duration,
    pub glitch: Duration,
    pub output_type: OutputType,
}

#[derive(Debug)]
struct BiDirectionalState {
    direction: PortDirection,
    debounce: Duration,
    glitch: Duration,
    last_event: Instant,
}

/// A pin that switches between input and output on demand.
///
/// The pin is reserved as a digital input whatever its current direction.
/// Reading the state turns the port into an input; writing turns it into an
/// output.
#[derive(Debug)]
pub struct BiDirectionalPort {
    claim: PinClaim,
    transport: Arc<dyn NativeTransport>,
    config: BiDirectionalConfig,
    state: Mutex<BiDirectionalState>,
    notifier: broadcast::Sender<ChangeResult<DigitalState>>,
}

impl BiDirectionalPort {
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        config: BiDirectionalConfig,
    ) -> Result<Self, PortError> {
        let channel = pin.digital_channel().ok_or_else(|| {
            ReservationError::CapabilityMismatch {
                pin: pin.name().to_string(),
                required: ChannelConfigurationType::DigitalInput,
                supported: pin.describe_channels(),
            }
        })?;
        if config.interrupt_mode != InterruptMode::None {
            let caps = channel.capabilities();
            let needed = ChannelCapabilities::INTERRUPT
                | ChannelCapabilities::DIGITAL_INPUT
                | ChannelCapabilities::DIGITAL_OUTPUT;
            if !caps.contains(needed) {
                return Err(PortError::InterruptNotSupported {
                    pin: pin.name().to_string(),
                });
            }
        }
        check_filter("debounce duration", config.debounce)?;
        check_filter("glitch duration", config.glitch)?;

        let claim =
            PinClaim::acquire_unchecked(arbiter, pin, ChannelConfigurationType::DigitalInput)?;
        let state = BiDirectionalState {
            direction: config.initial_direction,
            debounce: config.debounce,
            glitch: config.glitch,
            last_event: Instant::now(),
        };
        // Only a configured pin gets a port, and with it the unconfigure on drop.
        Self::configure(transport.as_ref(), pin, &config, &state, state.direction)?;
        let (notifier, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);

        Ok(Self {
            claim,
            transport,
            state: Mutex::new(state),
            config,
            notifier,
        })
    }

    pub fn pin(&self) -> &Pin {
        self.claim.pin()
    }

    pub fn interrupt_mode(&self) -> InterruptMode {
        self.config.interrupt_mode
    }

    pub fn direction(&self) -> PortDirection {
        lock(&self.state).direction
    }

    /// Reconfigure the pin for `direction`. No native call is made if the
    /// port already has that direction.
    pub fn set_direction(&self, direction: PortDirection) -> Result<(), PortError> {
        let mut state = lock(&self.state);
        if state.direction == direction {
            return Ok(());
        }
        Self::configure(self.transport.as_ref(), self.pin(), &self.config, &state, direction)?;
        state.direction = direction;
        log::debug!("{} switched to {:?}", self.pin(), direction);
        Ok(())
    }

    /// Read the line, switching to input first.
    pub fn state(&self) -> Result<bool, PortError> {
        self.set_direction(PortDirection::Input)?;
        let mut level = [0u8; 1];
        gpio_call(
            self.transport.as_ref(),
            self.pin(),
            NativeOpcode::GpioRead,
            GpioFlags::empty(),
            &[],
            &mut level,
        )?;
        Ok(level[0] != 0)
    }

    /// Drive the line, switching to output first.
    pub fn set_state(&self, value: bool) -> Result<(), PortError> {
        self.set_direction(PortDirection::Output)?;
        gpio_call(
            self.transport.as_ref(),
            self.pin(),
            NativeOpcode::GpioWrite,
            GpioFlags::empty(),
            &[u8::from(value)],
            &mut [],
        )?;
        Ok(())
    }

    pub fn debounce_duration(&self) -> Duration {
        lock(&self.state).debounce
    }

    pub fn set_debounce_duration(&self, value: Duration) -> Result<(), PortError> {
        check_filter("debounce duration", value)?;
        let mut state = lock(&self.state);
        state.debounce = value;
        self.rewire(&state)
    }

    pub fn glitch_duration(&self) -> Duration {
        lock(&self.state).glitch
    }

    pub fn set_glitch_duration(&self, value: Duration) -> Result<(), PortError> {
        check_filter("glitch duration", value)?;
        let mut state = lock(&self.state);
        state.glitch = value;
        self.rewire(&state)
    }

    /// Change notifications raised by [`on_interrupt`](Self::on_interrupt).
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeResult<DigitalState>> {
        self.notifier.subscribe()
    }

    /// Entry point for the platform's interrupt dispatcher. The previous
    /// state is taken to be the inverse of `level`, stamped with the time of
    /// the previous event.
    pub fn on_interrupt(&self, level: bool) {
        let now = Instant::now();
        let previous = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut state.last_event, now)
        };
        let result = ChangeResult::new(
            DigitalState::new(level, now),
            Some(DigitalState::new(!level, previous)),
        );
        // No subscribers is not an error.
        let _ = self.notifier.send(result);
    }

    fn rewire(&self, state: &BiDirectionalState) -> Result<(), PortError> {
        if state.direction == PortDirection::Input {
            Self::configure(
                self.transport.as_ref(),
                self.pin(),
                &self.config,
                state,
                PortDirection::Input,
            )?;
        }
        Ok(())
    }

    fn configure(
        transport: &dyn NativeTransport,
        pin: &Pin,
        config: &BiDirectionalConfig,
        state: &BiDirectionalState,
        direction: PortDirection,
    ) -> Result<(), PortError> {
        match direction {
            PortDirection::Input => {
                gpio_call(
                    transport,
                    pin,
                    NativeOpcode::GpioConfigure,
                    input_flags(config.resistor_mode, config.interrupt_mode),
                    &filter_payload(state.debounce, state.glitch),
                    &mut [],
                )?;
            }
            PortDirection::Output => {
                // Disable interrupts before the pin starts driving.
                gpio_call(
                    transport,
                    pin,
                    NativeOpcode::GpioConfigure,
                    input_flags(config.resistor_mode, InterruptMode::None),
                    &filter_payload(Duration::ZERO, Duration::ZERO),
                    &mut [],
                )?;
                gpio_call(
                    transport,
                    pin,
                    NativeOpcode::GpioConfigure,
                    output_flags(config.initial_state, config.output_type),
                    &[],
                    &mut [],
                )?;
            }
        }
        Ok(())
    }
}

impl Drop for BiDirectionalPort {
    fn drop(&mut self) {
        unconfigure(self.transport.as_ref(), self.claim.pin());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_encoding() {
        assert_eq!(
            input_flags(ResistorMode::InternalPullUp, InterruptMode::EdgeBoth),
            GpioFlags::PULL_UP | GpioFlags::INTERRUPT_RISING | GpioFlags::INTERRUPT_FALLING
        );
        assert_eq!(
            output_flags(true, OutputType::OpenDrain),
            GpioFlags::OUTPUT | GpioFlags::INITIAL_HIGH | GpioFlags::OPEN_DRAIN
        );
        assert_eq!(
            filter_payload(Duration::from_millis(300), Duration::from_millis(2)),
            [0x2C, 0x01, 0x02, 0x00]
        );
    }
}
