//! # Raspberry Pi Backend
//!
//! Implements [`NativeTransport`] on top of `rppal` so the HAL can drive real
//! buses from a Raspberry Pi 4/5. Pin keys are BCM GPIO numbers. The Pi has
//! no on-board converter, so [`NativeOpcode::AdcRead`] reports
//! "not supported".
//!
//! ```rust,no_run
//! use periph_hal::native::RppalTransport;
//!
//! let transport = RppalTransport::new()?;
//! # Ok::<(), periph_hal::native::raspberry_pi::RppalError>(())
//! ```

use crate::constants::{NATIVE_EIO, NATIVE_ENOTSUP, NATIVE_ESHUTDOWN, NATIVE_OK};
use crate::native::{GpioFlags, NativeCommand, NativeOpcode, NativeTransport};
use crate::util::lock;
use rppal::gpio::{Gpio, IoPin, Mode as GpioMode};
use rppal::i2c::I2c;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised while opening the Pi peripherals
#[derive(Error, Debug)]
pub enum RppalError {
    #[error("GPIO initialization failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("I2C initialization failed: {0}")]
    I2c(#[from] rppal::i2c::Error),
}

/// Native backend for Raspberry Pi hardware
pub struct RppalTransport {
    gpio: Gpio,
    i2c: Mutex<Option<I2c>>,
    spi: Mutex<Option<(Spi, u32, u8)>>,
    pins: Mutex<HashMap<u16, IoPin>>,
}

impl fmt::Debug for RppalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RppalTransport").finish_non_exhaustive()
    }
}

impl RppalTransport {
    /// Open GPIO and the primary I2C controller. SPI is opened lazily with
    /// the clock of the first transfer.
    pub fn new() -> Result<Self, RppalError> {
        let gpio = Gpio::new()?;
        let i2c = I2c::new()?;
        log::info!("Raspberry Pi backend ready (I2C bus {})", i2c.bus());
        Ok(Self {
            gpio,
            i2c: Mutex::new(Some(i2c)),
            spi: Mutex::new(None),
            pins: Mutex::new(HashMap::new()),
        })
    }

    fn i2c_data(&self, cmd: &mut NativeCommand<'_>) -> i32 {
        let mut guard = lock(&self.i2c);
        let Some(i2c) = guard.as_mut() else {
            return NATIVE_ESHUTDOWN;
        };
        if let Err(e) = i2c.set_slave_address(cmd.target) {
            log::debug!("I2C address 0x{:02X} rejected: {e}", cmd.target);
            return NATIVE_EIO;
        }
        let result = match (cmd.tx.is_empty(), cmd.rx.is_empty()) {
            (false, false) => i2c.write_read(cmd.tx, cmd.rx),
            (false, true) => i2c.write(cmd.tx).map(|_| ()),
            (true, false) => i2c.read(cmd.rx).map(|_| ()),
            (true, true) => Ok(()),
        };
        match result {
            Ok(()) => NATIVE_OK,
            Err(e) => {
                log::debug!("I2C transfer to 0x{:02X} failed: {e}", cmd.target);
                NATIVE_EIO
            }
        }
    }

    fn spi_data(&self, cmd: &mut NativeCommand<'_>) -> i32 {
        let mut guard = lock(&self.spi);
        let needs_open = match guard.as_ref() {
            Some((_, speed, mode)) => *speed != cmd.frequency_hz || *mode != cmd.flags,
            None => true,
        };
        if needs_open {
            let mode = match cmd.flags & 0x03 {
                0 => Mode::Mode0,
                1 => Mode::Mode1,
                2 => Mode::Mode2,
                _ => Mode::Mode3,
            };
            match Spi::new(Bus::Spi0, SlaveSelect::Ss0, cmd.frequency_hz, mode) {
                Ok(spi) => *guard = Some((spi, cmd.frequency_hz, cmd.flags)),
                Err(e) => {
                    log::error!("Failed to open SPI0: {e}");
                    return NATIVE_EIO;
                }
            }
        }
        let Some((spi, _, _)) = guard.as_mut() else {
            return NATIVE_EIO;
        };

        let result = if cmd.rx.is_empty() {
            spi.write(cmd.tx).map(|_| ())
        } else {
            let mut tx = cmd.tx.to_vec();
            tx.resize(cmd.rx.len().max(tx.len()), 0);
            let mut rx = vec![0u8; tx.len()];
            let r = spi.transfer(&mut rx, &tx).map(|_| ());
            let n = cmd.rx.len();
            cmd.rx.copy_from_slice(&rx[..n]);
            r
        };
        match result {
            Ok(()) => NATIVE_OK,
            Err(e) => {
                log::debug!("SPI transfer failed: {e}");
                NATIVE_EIO
            }
        }
    }

    fn gpio_configure(&self, cmd: &NativeCommand<'_>) -> i32 {
        let Ok(bcm) = u8::try_from(cmd.target) else {
            return NATIVE_EIO;
        };
        let flags = GpioFlags::from_bits_truncate(cmd.flags);
        let mode = if flags.contains(GpioFlags::OUTPUT) {
            GpioMode::Output
        } else {
            GpioMode::Input
        };
        match self.gpio.get(bcm) {
            Ok(pin) => {
                let mut io = pin.into_io(mode);
                if flags.contains(GpioFlags::PULL_UP) {
                    io.set_pullupdown(rppal::gpio::PullUpDown::PullUp);
                } else if flags.contains(GpioFlags::PULL_DOWN) {
                    io.set_pullupdown(rppal::gpio::PullUpDown::PullDown);
                }
                if flags.contains(GpioFlags::OUTPUT) && flags.contains(GpioFlags::INITIAL_HIGH) {
                    io.set_high();
                }
                lock(&self.pins).insert(cmd.target, io);
                NATIVE_OK
            }
            Err(e) => {
                log::error!("GPIO {bcm} unavailable: {e}");
                NATIVE_EIO
            }
        }
    }
}

impl NativeTransport for RppalTransport {
    fn ioctl(&self, opcode: NativeOpcode, cmd: &mut NativeCommand<'_>) -> i32 {
        match opcode {
            NativeOpcode::I2cData => self.i2c_data(cmd),
            NativeOpcode::I2cShutdown => {
                lock(&self.i2c).take();
                NATIVE_OK
            }
            NativeOpcode::SpiData => self.spi_data(cmd),
            NativeOpcode::GpioConfigure => self.gpio_configure(cmd),
            NativeOpcode::GpioUnconfigure => {
                lock(&self.pins).remove(&cmd.target);
                NATIVE_OK
            }
            NativeOpcode::GpioWrite => match lock(&self.pins).get_mut(&cmd.target) {
                Some(pin) => {
                    if cmd.tx.first().is_some_and(|b| *b != 0) {
                        pin.set_high();
                    } else {
                        pin.set_low();
                    }
                    NATIVE_OK
                }
                None => NATIVE_EIO,
            },
            NativeOpcode::GpioRead => match lock(&self.pins).get(&cmd.target) {
                Some(pin) => {
                    if let Some(first) = cmd.rx.first_mut() {
                        *first = u8::from(pin.is_high());
                    }
                    NATIVE_OK
                }
                None => NATIVE_EIO,
            },
            NativeOpcode::AdcRead => NATIVE_ENOTSUP,
        }
    }
}
