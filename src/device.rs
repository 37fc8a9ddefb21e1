//! # Device
//!
//! [`Device`] is the entry point of the HAL. It owns the resources that
//! every port and bus shares: the native transport, the [`PinArbiter`], the
//! analog converter and the configuration. Buses and ports are created by
//! pin name from the pin table the device was built with.

use crate::adc::AnalogConverter;
use crate::bus::{I2cBus, SpiBus, SpiClockConfiguration, SpiMode};
use crate::config::HalConfig;
use crate::coprocessor::{Esp32WiFiAdapter, SpiCoprocessorTransport};
use crate::error::{HalError, Result};
use crate::native::NativeTransport;
use crate::pins::{Pin, PinArbiter, PinDefinitions};
use crate::ports::{
    AnalogInputPort, AnalogPortOptions, BiDirectionalConfig, BiDirectionalPort, DigitalInputPort,
    DigitalOutputPort, OutputType, ResistorMode,
};
use std::fmt;
use std::sync::Arc;

/// A board: pin table, native driver and shared hardware resources.
pub struct Device {
    transport: Arc<dyn NativeTransport>,
    pins: Box<dyn PinDefinitions + Send + Sync>,
    arbiter: Arc<PinArbiter>,
    converter: Arc<AnalogConverter>,
    config: HalConfig,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("pins", &self.pins.all_pins().len())
            .field("reserved", &self.arbiter.reserved_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Build a device after validating `config`.
    pub fn new(
        transport: Arc<dyn NativeTransport>,
        pins: impl PinDefinitions + Send + Sync + 'static,
        config: HalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let converter = Arc::new(AnalogConverter::new(
            Arc::clone(&transport),
            config.analog.max_raw_value,
        ));
        log::info!("Device ready with {} pins", pins.all_pins().len());

        Ok(Self {
            transport,
            pins: Box::new(pins),
            arbiter: Arc::new(PinArbiter::new()),
            converter,
            config,
        })
    }

    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &Arc<PinArbiter> {
        &self.arbiter
    }

    pub fn converter(&self) -> &Arc<AnalogConverter> {
        &self.converter
    }

    pub fn transport(&self) -> &Arc<dyn NativeTransport> {
        &self.transport
    }

    pub fn pins(&self) -> &[Pin] {
        self.pins.all_pins()
    }

    /// Look up a pin by name.
    pub fn pin(&self, name: &str) -> Result<&Pin> {
        self.pins
            .find(name)
            .ok_or_else(|| HalError::UnknownPin(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Buses
    // ------------------------------------------------------------------

    /// Two-wire bus on the named pins. `None` uses the configured default
    /// frequency.
    pub fn create_i2c_bus(
        &self,
        clock: &str,
        data: &str,
        frequency_hz: Option<u32>,
    ) -> Result<Arc<I2cBus>> {
        let i2c = &self.config.i2c;
        let bus = I2cBus::new(
            Arc::clone(&self.transport),
            self.pin(clock)?,
            self.pin(data)?,
            frequency_hz.unwrap_or(i2c.default_frequency_hz),
            &i2c.supported_frequencies_hz,
        )?;
        Ok(Arc::new(bus))
    }

    /// Four-wire bus on the named pins.
    pub fn create_spi_bus(
        &self,
        clock: &str,
        mosi: &str,
        miso: &str,
        configuration: Option<SpiClockConfiguration>,
    ) -> Result<Arc<SpiBus>> {
        let spi = &self.config.spi;
        let configuration = configuration
            .unwrap_or_else(|| SpiClockConfiguration::new(spi.default_frequency_hz, SpiMode::Mode0));
        let bus = SpiBus::new(
            Arc::clone(&self.transport),
            self.pin(clock)?,
            self.pin(mosi)?,
            self.pin(miso)?,
            configuration,
            &spi.supported_frequencies_hz,
        )?;
        Ok(Arc::new(bus))
    }

    // ------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------

    pub fn create_digital_output_port(
        &self,
        pin: &str,
        initial_state: bool,
        output_type: OutputType,
    ) -> Result<DigitalOutputPort> {
        Ok(DigitalOutputPort::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.arbiter),
            self.pin(pin)?,
            initial_state,
            output_type,
        )?)
    }

    pub fn create_digital_input_port(
        &self,
        pin: &str,
        resistor_mode: ResistorMode,
    ) -> Result<DigitalInputPort> {
        Ok(DigitalInputPort::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.arbiter),
            self.pin(pin)?,
            resistor_mode,
        )?)
    }

    pub fn create_bidirectional_port(
        &self,
        pin: &str,
        config: BiDirectionalConfig,
    ) -> Result<BiDirectionalPort> {
        Ok(BiDirectionalPort::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.arbiter),
            self.pin(pin)?,
            config,
        )?)
    }

    /// Analog input on the shared converter. `None` takes the sampling
    /// parameters from the configuration.
    pub fn create_analog_input_port(
        &self,
        pin: &str,
        options: Option<AnalogPortOptions>,
    ) -> Result<AnalogInputPort> {
        let options = options.unwrap_or_else(|| AnalogPortOptions::from(&self.config.analog));
        Ok(AnalogInputPort::new(
            Arc::clone(&self.converter),
            Arc::clone(&self.arbiter),
            self.pin(pin)?,
            options,
        )?)
    }

    // ------------------------------------------------------------------
    // Coprocessor
    // ------------------------------------------------------------------

    /// WiFi adapter on the coprocessor attached to `bus`, selected by the
    /// named chip-select pin. Must be called inside a tokio runtime.
    pub fn create_wifi_adapter(
        &self,
        bus: Arc<SpiBus>,
        chip_select: &str,
    ) -> Result<Esp32WiFiAdapter> {
        let chip_select =
            Arc::new(self.create_digital_output_port(chip_select, true, OutputType::PushPull)?);
        let transport = Arc::new(SpiCoprocessorTransport::new(bus, chip_select));
        Ok(Esp32WiFiAdapter::new(transport, self.config.wifi.clone())?)
    }
}
