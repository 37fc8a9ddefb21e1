//! Minimal value types exchanged with the unit-of-measure layer.

use std::fmt;
use std::time::Instant;

/// An electrical potential in volts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Voltage(f64);

impl Voltage {
    pub const fn from_volts(volts: f64) -> Self {
        Self(volts)
    }

    pub fn from_millivolts(millivolts: f64) -> Self {
        Self(millivolts / 1000.0)
    }

    pub const fn volts(&self) -> f64 {
        self.0
    }

    pub fn millivolts(&self) -> f64 {
        self.0 * 1000.0
    }

    /// Arithmetic mean of a set of readings, `None` when empty.
    pub fn mean(samples: &[Voltage]) -> Option<Voltage> {
        if samples.is_empty() {
            return None;
        }
        let sum: f64 = samples.iter().map(|v| v.0).sum();
        Some(Voltage(sum / samples.len() as f64))
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} V", self.0)
    }
}

/// New and previous value carried by change notifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeResult<T> {
    pub new: T,
    pub old: Option<T>,
}

impl<T> ChangeResult<T> {
    pub fn new(new: T, old: Option<T>) -> Self {
        Self { new, old }
    }
}

/// Level of a digital line together with the moment it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalState {
    pub state: bool,
    pub time: Instant,
}

impl DigitalState {
    pub fn new(state: bool, time: Instant) -> Self {
        Self { state, time }
    }
}
