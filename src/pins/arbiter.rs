//! # Pin Reservation Registry
//!
//! The arbiter records which configuration currently owns each physical pin.
//! A reservation is all-or-nothing: a second `reserve` on a pin that is
//! already held fails without touching the existing reservation.
//!
//! Each pin has its own entry lock. The outer map is only write-locked the
//! first time a pin name is seen, so reserving or releasing unrelated pins
//! never serializes on a single global lock.

use crate::pins::pin::{ChannelConfigurationType, Pin};
use crate::util::lock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Errors raised while claiming or releasing pins
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The pin already has a live reservation
    #[error("Pin {pin} is already in use as {current}")]
    AlreadyInUse {
        pin: String,
        current: ChannelConfigurationType,
    },

    /// The pin cannot be routed to the requested channel
    #[error("Pin {pin} does not support {required}. It supports: {supported}")]
    CapabilityMismatch {
        pin: String,
        required: ChannelConfigurationType,
        supported: String,
    },

    /// Release of a pin that holds no reservation
    #[error("Pin {pin} is not reserved")]
    NotReserved { pin: String },

    /// The token belongs to an earlier reservation of the pin
    #[error("Reservation token does not match the active reservation of pin {pin}")]
    StaleToken { pin: String },
}

#[derive(Debug, Clone, Copy)]
struct Reservation {
    id: u64,
    kind: ChannelConfigurationType,
}

type Entry = Arc<Mutex<Option<Reservation>>>;

/// Proof of a live reservation. Not cloneable; giving it back to
/// [`PinArbiter::release`] ends the reservation.
#[derive(Debug, PartialEq, Eq)]
pub struct ReservationToken {
    pin: String,
    kind: ChannelConfigurationType,
    id: u64,
}

impl ReservationToken {
    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn kind(&self) -> ChannelConfigurationType {
        self.kind
    }
}

/// Registry of pin reservations.
#[derive(Debug, Default)]
pub struct PinArbiter {
    entries: RwLock<HashMap<String, Entry>>,
    next_id: AtomicU64,
}

impl PinArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, pin: &str) -> Entry {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(pin) {
                return Arc::clone(entry);
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(pin.to_string()).or_default())
    }

    fn existing_entry(&self, pin: &str) -> Option<Entry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(pin).cloned()
    }

    /// Claim `pin` for `kind`.
    pub fn reserve(
        &self,
        pin: &Pin,
        kind: ChannelConfigurationType,
    ) -> Result<ReservationToken, ReservationError> {
        let entry = self.entry(pin.name());
        let mut slot = lock(&entry);

        if let Some(existing) = *slot {
            log::debug!(
                "Reservation of {} as {} denied, held as {}",
                pin.name(),
                kind,
                existing.kind
            );
            return Err(ReservationError::AlreadyInUse {
                pin: pin.name().to_string(),
                current: existing.kind,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *slot = Some(Reservation { id, kind });
        log::debug!("Pin {} reserved as {}", pin.name(), kind);

        Ok(ReservationToken {
            pin: pin.name().to_string(),
            kind,
            id,
        })
    }

    /// Claim `pin` for `kind` after checking the pin can carry that channel.
    pub fn reserve_checked(
        &self,
        pin: &Pin,
        kind: ChannelConfigurationType,
    ) -> Result<ReservationToken, ReservationError> {
        if !pin.supports(kind) {
            return Err(ReservationError::CapabilityMismatch {
                pin: pin.name().to_string(),
                required: kind,
                supported: pin.describe_channels(),
            });
        }
        self.reserve(pin, kind)
    }

    /// End the reservation represented by `token`.
    pub fn release(&self, token: ReservationToken) -> Result<(), ReservationError> {
        let entry = self
            .existing_entry(&token.pin)
            .ok_or_else(|| ReservationError::NotReserved {
                pin: token.pin.clone(),
            })?;
        let mut slot = lock(&entry);

        match *slot {
            None => Err(ReservationError::NotReserved { pin: token.pin }),
            Some(current) if current.id != token.id => {
                Err(ReservationError::StaleToken { pin: token.pin })
            }
            Some(_) => {
                *slot = None;
                log::debug!("Pin {} released", token.pin);
                Ok(())
            }
        }
    }

    /// Current configuration of the pin, if reserved.
    pub fn reservation(&self, pin: &str) -> Option<ChannelConfigurationType> {
        self.existing_entry(pin)
            .and_then(|entry| lock(&entry).map(|r| r.kind))
    }

    pub fn is_reserved(&self, pin: &str) -> bool {
        self.reservation(pin).is_some()
    }

    /// Number of pins currently reserved.
    pub fn reserved_count(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|e| lock(e).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::pin::ChannelInfo;

    fn digital(name: &str) -> Pin {
        Pin::new(
            name,
            1,
            vec![ChannelInfo::Digital {
                input: true,
                output: true,
                interrupt: false,
            }],
        )
    }

    #[test]
    fn test_release_restores_availability() {
        let arbiter = PinArbiter::new();
        let pin = digital("D01");
        let token = arbiter
            .reserve(&pin, ChannelConfigurationType::DigitalOutput)
            .unwrap();
        assert_eq!(
            arbiter.reservation("D01"),
            Some(ChannelConfigurationType::DigitalOutput)
        );
        arbiter.release(token).unwrap();
        assert!(!arbiter.is_reserved("D01"));
        assert!(arbiter
            .reserve(&pin, ChannelConfigurationType::DigitalInput)
            .is_ok());
    }

    #[test]
    fn test_stale_token_rejected() {
        let arbiter = PinArbiter::new();
        let pin = digital("D02");
        let first = arbiter
            .reserve(&pin, ChannelConfigurationType::DigitalInput)
            .unwrap();
        let forged = ReservationToken {
            pin: "D02".to_string(),
            kind: ChannelConfigurationType::DigitalInput,
            id: first.id + 100,
        };
        assert_eq!(
            arbiter.release(forged),
            Err(ReservationError::StaleToken {
                pin: "D02".to_string()
            })
        );
        assert!(arbiter.is_reserved("D02"));
        arbiter.release(first).unwrap();
    }
}
