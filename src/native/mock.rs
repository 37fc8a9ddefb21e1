//! Mock native driver for testing
//!
//! [`MockTransport`] simulates the driver ioctl without hardware: two-wire
//! devices answer from scripted response queues, four-wire reads pop queued
//! chunks, GPIO levels and ADC readings are held per pin key, and any
//! opcode can be made to fail with an injected error code.
//!
//! Every call is appended to a command log, and the transport tracks the
//! highest number of calls that were ever inside `ioctl` at the same time,
//! which lets tests check bus serialization.

use crate::constants::{NATIVE_EHOSTDOWN, NATIVE_ESHUTDOWN, NATIVE_OK};
use crate::native::{GpioFlags, NativeCommand, NativeOpcode, NativeTransport};
use crate::util::lock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub opcode: NativeOpcode,
    pub bus: u8,
    pub target: u16,
    pub frequency_hz: u32,
    pub flags: u8,
    pub tx: Vec<u8>,
    pub rx_len: usize,
    /// Status returned to the caller
    pub status: i32,
}

#[derive(Debug, Default)]
struct MockState {
    i2c_devices: HashSet<u16>,
    i2c_responses: HashMap<u16, VecDeque<Vec<u8>>>,
    i2c_shutdown: HashSet<u8>,
    spi_responses: VecDeque<Vec<u8>>,
    adc_values: HashMap<u16, VecDeque<u32>>,
    gpio_levels: HashMap<u16, bool>,
    gpio_flags: HashMap<u16, GpioFlags>,
    errors: HashMap<NativeOpcode, VecDeque<i32>>,
    log: Vec<CommandRecord>,
}

/// Scripted stand-in for the native driver
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    call_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a two-wire device answer at `address`. Reads return zeros until
    /// responses are queued.
    pub fn add_i2c_device(&self, address: u16) {
        lock(&self.state).i2c_devices.insert(address);
    }

    /// Queue the bytes returned by the next read from `address`. Registers
    /// the device if needed.
    pub fn queue_i2c_response(&self, address: u16, bytes: &[u8]) {
        let mut state = lock(&self.state);
        state.i2c_devices.insert(address);
        state
            .i2c_responses
            .entry(address)
            .or_default()
            .push_back(bytes.to_vec());
    }

    /// Queue the bytes returned by the next four-wire transfer that reads.
    pub fn queue_spi_response(&self, bytes: &[u8]) {
        lock(&self.state).spi_responses.push_back(bytes.to_vec());
    }

    /// Raw converter values for `pin_key`, consumed one per conversion. The
    /// last value keeps being returned once the queue runs dry.
    pub fn push_adc_values<I: IntoIterator<Item = u32>>(&self, pin_key: u16, values: I) {
        lock(&self.state)
            .adc_values
            .entry(pin_key)
            .or_default()
            .extend(values);
    }

    pub fn set_gpio_level(&self, pin_key: u16, level: bool) {
        lock(&self.state).gpio_levels.insert(pin_key, level);
    }

    pub fn gpio_level(&self, pin_key: u16) -> Option<bool> {
        lock(&self.state).gpio_levels.get(&pin_key).copied()
    }

    /// Configuration applied by the last `GpioConfigure`, `None` once the
    /// pin was unconfigured.
    pub fn gpio_configuration(&self, pin_key: u16) -> Option<GpioFlags> {
        lock(&self.state).gpio_flags.get(&pin_key).copied()
    }

    /// Fail the next call with `opcode` by returning `code`.
    pub fn inject_error(&self, opcode: NativeOpcode, code: i32) {
        lock(&self.state)
            .errors
            .entry(opcode)
            .or_default()
            .push_back(code);
    }

    /// Block every call for `delay` before it is processed.
    pub fn set_call_delay(&self, delay: Duration) {
        *lock(&self.call_delay) = Some(delay);
    }

    pub fn commands(&self) -> Vec<CommandRecord> {
        lock(&self.state).log.clone()
    }

    pub fn commands_for(&self, opcode: NativeOpcode) -> Vec<CommandRecord> {
        lock(&self.state)
            .log
            .iter()
            .filter(|r| r.opcode == opcode)
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        lock(&self.state).log.clear();
    }

    /// Highest number of calls observed inside `ioctl` at once.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn process(state: &mut MockState, opcode: NativeOpcode, cmd: &mut NativeCommand<'_>) -> i32 {
        if let Some(code) = state.errors.get_mut(&opcode).and_then(VecDeque::pop_front) {
            return code;
        }

        match opcode {
            NativeOpcode::I2cData => {
                if state.i2c_shutdown.contains(&cmd.bus) {
                    return NATIVE_ESHUTDOWN;
                }
                if !state.i2c_devices.contains(&cmd.target) {
                    return NATIVE_EHOSTDOWN;
                }
                if !cmd.rx.is_empty() {
                    let response = state
                        .i2c_responses
                        .get_mut(&cmd.target)
                        .and_then(VecDeque::pop_front)
                        .unwrap_or_default();
                    fill(cmd.rx, &response);
                }
                NATIVE_OK
            }
            NativeOpcode::I2cShutdown => {
                state.i2c_shutdown.insert(cmd.bus);
                NATIVE_OK
            }
            NativeOpcode::SpiData => {
                if !cmd.rx.is_empty() {
                    let response = state.spi_responses.pop_front().unwrap_or_default();
                    fill(cmd.rx, &response);
                }
                NATIVE_OK
            }
            NativeOpcode::GpioConfigure => {
                let flags = GpioFlags::from_bits_truncate(cmd.flags);
                state.gpio_flags.insert(cmd.target, flags);
                if flags.contains(GpioFlags::OUTPUT) {
                    state
                        .gpio_levels
                        .insert(cmd.target, flags.contains(GpioFlags::INITIAL_HIGH));
                }
                NATIVE_OK
            }
            NativeOpcode::GpioUnconfigure => {
                state.gpio_flags.remove(&cmd.target);
                NATIVE_OK
            }
            NativeOpcode::GpioWrite => {
                let level = cmd.tx.first().is_some_and(|b| *b != 0);
                state.gpio_levels.insert(cmd.target, level);
                NATIVE_OK
            }
            NativeOpcode::GpioRead => {
                let level = state.gpio_levels.get(&cmd.target).copied().unwrap_or(false);
                if let Some(first) = cmd.rx.first_mut() {
                    *first = u8::from(level);
                }
                NATIVE_OK
            }
            NativeOpcode::AdcRead => {
                let queue = state.adc_values.entry(cmd.target).or_default();
                let value = if queue.len() > 1 {
                    queue.pop_front().unwrap_or(0)
                } else {
                    queue.front().copied().unwrap_or(0)
                };
                fill(cmd.rx, &value.to_le_bytes());
                NATIVE_OK
            }
        }
    }
}

fn fill(dst: &mut [u8], src: &[u8]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
}

impl NativeTransport for MockTransport {
    fn ioctl(&self, opcode: NativeOpcode, cmd: &mut NativeCommand<'_>) -> i32 {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *lock(&self.call_delay);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let status = {
            let mut state = lock(&self.state);
            let status = Self::process(&mut state, opcode, cmd);
            state.log.push(CommandRecord {
                opcode,
                bus: cmd.bus,
                target: cmd.target,
                frequency_hz: cmd.frequency_hz,
                flags: cmd.flags,
                tx: cmd.tx.to_vec(),
                rx_len: cmd.rx.len(),
                status,
            });
            status
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_reports_no_device() {
        let mock = MockTransport::new();
        let mut rx = [0u8; 2];
        let mut cmd = NativeCommand::new(0x20).rx(&mut rx);
        assert_eq!(mock.ioctl(NativeOpcode::I2cData, &mut cmd), NATIVE_EHOSTDOWN);
    }

    #[test]
    fn test_adc_queue_repeats_last_value() {
        let mock = MockTransport::new();
        mock.push_adc_values(3, [10, 20]);
        let read = || {
            let mut rx = [0u8; 4];
            let mut cmd = NativeCommand::new(3).rx(&mut rx);
            assert_eq!(mock.ioctl(NativeOpcode::AdcRead, &mut cmd), NATIVE_OK);
            u32::from_le_bytes(rx)
        };
        assert_eq!(read(), 10);
        assert_eq!(read(), 20);
        assert_eq!(read(), 20);
    }

    #[test]
    fn test_injected_error_is_one_shot() {
        let mock = MockTransport::new();
        mock.inject_error(NativeOpcode::SpiData, 5);
        let mut cmd = NativeCommand::new(0);
        assert_eq!(mock.ioctl(NativeOpcode::SpiData, &mut cmd), 5);
        let mut cmd = NativeCommand::new(0);
        assert_eq!(mock.ioctl(NativeOpcode::SpiData, &mut cmd), NATIVE_OK);
        assert_eq!(mock.commands_for(NativeOpcode::SpiData).len(), 2);
    }
}
