//! # Analog Input Port
//!
//! An analog port can be read on demand with [`AnalogInputPort::read`] or
//! sampled continuously in the background. The background task collects a
//! batch of samples, swaps the whole batch into the port's sample buffer,
//! then broadcasts the new mean together with the previous one.
//!
//! ## Locking
//!
//! Each conversion holds the shared converter lock (one physical converter
//! serves every analog pin). The sample buffer has its own lock so readers
//! are never blocked behind a slow conversion.
//!
//! ## Shutdown
//!
//! [`AnalogInputPort::stop_sampling`] cancels the task and waits for it to
//! finish. Once it returns no further notification is sent. A batch that
//! is interrupted half way is discarded, never partially published.

use crate::adc::AnalogConverter;
use crate::cancel::CancelToken;
use crate::config::AnalogConfig;
use crate::constants::*;
use crate::log_warn_throttled;
use crate::pins::{ChannelConfigurationType, Pin, PinArbiter};
use crate::ports::{PinClaim, PortError};
use crate::units::{ChangeResult, Voltage};
use crate::util::{lock, LogThrottle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Sampling parameters for one analog port
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogPortOptions {
    /// Samples per batch and per one-shot read, at least 1
    pub sample_count: usize,
    pub sample_interval: Duration,
    pub update_interval: Duration,
    pub reference: Voltage,
}

impl Default for AnalogPortOptions {
    fn default() -> Self {
        Self {
            sample_count: ANALOG_DEFAULT_SAMPLE_COUNT,
            sample_interval: ANALOG_DEFAULT_SAMPLE_INTERVAL,
            update_interval: ANALOG_DEFAULT_UPDATE_INTERVAL,
            reference: Voltage::from_volts(ANALOG_DEFAULT_REFERENCE_VOLTAGE),
        }
    }
}

impl From<&AnalogConfig> for AnalogPortOptions {
    fn from(config: &AnalogConfig) -> Self {
        Self {
            sample_count: config.sample_count,
            sample_interval: config.sample_interval(),
            update_interval: config.update_interval(),
            reference: config.reference(),
        }
    }
}

/// State shared between the port and its sampling task
#[derive(Debug)]
struct Shared {
    pin: Pin,
    converter: Arc<AnalogConverter>,
    sample_count: usize,
    sample_interval: Duration,
    reference: Voltage,
    update_interval: Mutex<Duration>,
    buffer: Mutex<Vec<Voltage>>,
    previous: Mutex<Option<Voltage>>,
    notifier: broadcast::Sender<ChangeResult<Voltage>>,
}

impl Shared {
    fn sample(&self) -> Result<Voltage, PortError> {
        Ok(self.converter.read_voltage(&self.pin, self.reference)?)
    }

    /// Fill one batch. `Ok(None)` means the batch was cancelled.
    async fn collect_batch(&self, cancel: &CancelToken) -> Result<Option<Vec<Voltage>>, PortError> {
        let mut batch = Vec::with_capacity(self.sample_count);
        for i in 0..self.sample_count {
            batch.push(self.sample()?);
            if i + 1 < self.sample_count {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(self.sample_interval) => {}
                }
            }
        }
        Ok(Some(batch))
    }

    fn publish(&self, batch: Vec<Voltage>) {
        let Some(mean) = Voltage::mean(&batch) else {
            return;
        };
        *lock(&self.buffer) = batch;
        let old = lock(&self.previous).replace(mean);
        // A send with no subscribers is not an error.
        let _ = self.notifier.send(ChangeResult::new(mean, old));
    }

    async fn run(self: Arc<Self>, cancel: CancelToken) {
        log::debug!("Sampling started on {}", self.pin);
        let mut throttle = LogThrottle::new(10_000, 3);

        loop {
            match self.collect_batch(&cancel).await {
                Ok(Some(batch)) => self.publish(batch),
                Ok(None) => break,
                Err(e) => {
                    log_warn_throttled!(throttle, "Sampling {} failed: {}", self.pin, e);
                }
            }

            let interval = *lock(&self.update_interval);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        log::debug!("Sampling stopped on {}", self.pin);
    }
}

#[derive(Debug)]
struct SamplingTask {
    handle: JoinHandle<()>,
    cancel: CancelToken,
}

/// A pin read through the shared analog converter.
#[derive(Debug)]
pub struct AnalogInputPort {
    shared: Arc<Shared>,
    task: Mutex<Option<SamplingTask>>,
    claim: PinClaim,
}

impl AnalogInputPort {
    /// Claim `pin` as an analog input.
    pub fn new(
        converter: Arc<AnalogConverter>,
        arbiter: Arc<PinArbiter>,
        pin: &Pin,
        options: AnalogPortOptions,
    ) -> Result<Self, PortError> {
        if options.sample_count == 0 {
            return Err(PortError::InvalidConfiguration(
                "sample count must be at least 1".to_string(),
            ));
        }
        let claim = PinClaim::acquire(arbiter, pin, ChannelConfigurationType::AnalogInput)?;
        let (notifier, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                pin: pin.clone(),
                converter,
                sample_count: options.sample_count,
                sample_interval: options.sample_interval,
                reference: options.reference,
                update_interval: Mutex::new(options.update_interval),
                buffer: Mutex::new(Vec::with_capacity(options.sample_count)),
                previous: Mutex::new(None),
                notifier,
            }),
            task: Mutex::new(None),
            claim,
        })
    }

    pub fn pin(&self) -> &Pin {
        self.claim.pin()
    }

    pub fn reference_voltage(&self) -> Voltage {
        self.shared.reference
    }

    pub fn sample_count(&self) -> usize {
        self.shared.sample_count
    }

    pub fn sample_interval(&self) -> Duration {
        self.shared.sample_interval
    }

    pub fn update_interval(&self) -> Duration {
        *lock(&self.shared.update_interval)
    }

    /// Start the background loop. Does nothing if it is already running.
    /// `update_interval`, when given, replaces the delay between batches.
    pub fn start_sampling(&self, update_interval: Option<Duration>) -> Result<(), PortError> {
        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PortError::NoRuntime)?;
        if let Some(interval) = update_interval {
            *lock(&self.shared.update_interval) = interval;
        }

        let cancel = CancelToken::new();
        let handle = runtime.spawn(Arc::clone(&self.shared).run(cancel.clone()));
        *task = Some(SamplingTask { handle, cancel });
        Ok(())
    }

    /// Stop the background loop and wait for it to exit. Safe to call when
    /// not sampling.
    pub async fn stop_sampling(&self) {
        let task = lock(&self.task).take();
        if let Some(SamplingTask { handle, cancel }) = task {
            cancel.cancel();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::error!("Sampling task on {} panicked: {e}", self.pin());
                }
            }
        }
    }

    pub fn is_sampling(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Take `sample_count` fresh samples and return their mean. Does not
    /// touch the sample buffer.
    pub async fn read(&self) -> Result<Voltage, PortError> {
        let count = self.shared.sample_count;
        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            samples.push(self.shared.sample()?);
            if i + 1 < count {
                tokio::time::sleep(self.shared.sample_interval).await;
            }
        }
        Voltage::mean(&samples)
            .ok_or_else(|| PortError::InvalidConfiguration("no samples taken".to_string()))
    }

    /// Mean of the last published batch, `None` before the first batch.
    pub fn voltage(&self) -> Option<Voltage> {
        Voltage::mean(&lock(&self.shared.buffer))
    }

    /// Copy of the last published batch.
    pub fn sample_buffer(&self) -> Vec<Voltage> {
        lock(&self.shared.buffer).clone()
    }

    /// Change notifications from the background loop.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeResult<Voltage>> {
        self.shared.notifier.subscribe()
    }
}

impl Drop for AnalogInputPort {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }
}
