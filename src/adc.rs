//! # Shared Analog Converter
//!
//! The device has one physical converter multiplexed across every analog
//! pin, so conversions are serialized system-wide by one lock that is
//! separate from any bus lock. The handle is created by the device and
//! injected into each analog port.

use crate::bus::{self, BusError};
use crate::native::{NativeCommand, NativeOpcode, NativeTransport};
use crate::pins::Pin;
use crate::units::Voltage;
use crate::util::lock;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Handle to the analog-to-digital converter
pub struct AnalogConverter {
    transport: Arc<dyn NativeTransport>,
    lock: Mutex<()>,
    max_raw: u32,
}

impl fmt::Debug for AnalogConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalogConverter")
            .field("max_raw", &self.max_raw)
            .finish_non_exhaustive()
    }
}

impl AnalogConverter {
    /// `max_raw` is the reading that corresponds to the reference voltage.
    pub fn new(transport: Arc<dyn NativeTransport>, max_raw: u32) -> Self {
        Self {
            transport,
            lock: Mutex::new(()),
            max_raw: max_raw.max(1),
        }
    }

    pub fn max_raw_value(&self) -> u32 {
        self.max_raw
    }

    /// One conversion on `pin`, holding the converter for its duration.
    pub fn read_raw(&self, pin: &Pin) -> Result<u32, BusError> {
        let _converter = lock(&self.lock);
        let mut raw = [0u8; 4];
        let mut command = NativeCommand::new(pin.key()).rx(&mut raw);
        bus::issue(self.transport.as_ref(), NativeOpcode::AdcRead, &mut command)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Scale a raw reading against `reference`.
    pub fn to_voltage(&self, raw: u32, reference: Voltage) -> Voltage {
        Voltage::from_volts(f64::from(raw) * reference.volts() / f64::from(self.max_raw))
    }

    pub fn read_voltage(&self, pin: &Pin, reference: Voltage) -> Result<Voltage, BusError> {
        let raw = self.read_raw(pin)?;
        Ok(self.to_voltage(raw, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::MockTransport;

    #[test]
    fn test_to_voltage_scales_against_reference() {
        let converter = AnalogConverter::new(Arc::new(MockTransport::new()), 4095);
        let full = converter.to_voltage(4095, Voltage::from_volts(3.3));
        assert!((full.volts() - 3.3).abs() < 1e-9);
        let zero = converter.to_voltage(0, Voltage::from_volts(3.3));
        assert_eq!(zero.volts(), 0.0);
    }
}
