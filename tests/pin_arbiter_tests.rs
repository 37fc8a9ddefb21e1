//! Tests for pin reservation: exclusivity, capability checks and release
//! through port drop.

mod common;

use common::{board_pins, device, pin};
use periph_hal::pins::{ChannelConfigurationType, PinArbiter, ReservationError};
use periph_hal::ports::{OutputType, ResistorMode};
use periph_hal::HalError;
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

/// A second reservation fails and leaves the first untouched.
#[test]
fn test_double_reservation_rejected() {
    let arbiter = PinArbiter::new();
    let d01 = pin("D01");
    let token = arbiter
        .reserve(&d01, ChannelConfigurationType::DigitalOutput)
        .unwrap();

    let err = arbiter
        .reserve(&d01, ChannelConfigurationType::DigitalInput)
        .unwrap_err();
    assert_eq!(
        err,
        ReservationError::AlreadyInUse {
            pin: "D01".to_string(),
            current: ChannelConfigurationType::DigitalOutput,
        }
    );
    assert_eq!(
        arbiter.reservation("D01"),
        Some(ChannelConfigurationType::DigitalOutput)
    );
    arbiter.release(token).unwrap();
}

#[test]
fn test_capability_mismatch() {
    let arbiter = PinArbiter::new();
    let err = arbiter
        .reserve_checked(&pin("D09"), ChannelConfigurationType::DigitalOutput)
        .unwrap_err();
    assert!(matches!(err, ReservationError::CapabilityMismatch { .. }));
    assert_eq!(
        err.to_string(),
        "Pin D09 does not support digital output. It supports: PWM3_CH1"
    );
    assert!(!arbiter.is_reserved("D09"));
}

#[test]
fn test_release_of_unknown_pin_is_reported() {
    let first = PinArbiter::new();
    let second = PinArbiter::new();
    let token = first
        .reserve(&pin("D02"), ChannelConfigurationType::DigitalInput)
        .unwrap();
    assert_eq!(
        second.release(token),
        Err(ReservationError::NotReserved {
            pin: "D02".to_string()
        })
    );
}

/// Only one of many racing callers wins a pin.
#[test]
fn test_concurrent_reservation_has_one_winner() {
    let arbiter = Arc::new(PinArbiter::new());
    let barrier = Arc::new(Barrier::new(16));
    let d00 = pin("D00");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let arbiter = Arc::clone(&arbiter);
            let barrier = Arc::clone(&barrier);
            let d00 = d00.clone();
            thread::spawn(move || {
                barrier.wait();
                arbiter
                    .reserve(&d00, ChannelConfigurationType::DigitalInput)
                    .ok()
            })
        })
        .collect();

    let winners: Vec<_> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(arbiter.reserved_count(), 1);
}

/// Dropping a port gives its pin back.
#[test]
fn test_port_drop_releases_pin() {
    let (device, _mock) = device();
    let port = device
        .create_digital_output_port("D01", false, OutputType::PushPull)
        .unwrap();
    assert!(device.arbiter().is_reserved("D01"));

    let err = device
        .create_digital_input_port("D01", ResistorMode::Disabled)
        .unwrap_err();
    assert!(matches!(
        err,
        HalError::Port(periph_hal::PortError::Reservation(
            ReservationError::AlreadyInUse { .. }
        ))
    ));

    drop(port);
    assert!(!device.arbiter().is_reserved("D01"));
    device
        .create_digital_input_port("D01", ResistorMode::Disabled)
        .unwrap();
}

#[test]
fn test_unknown_pin_name() {
    let (device, _mock) = device();
    let err = device
        .create_digital_output_port("D99", false, OutputType::PushPull)
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown pin: D99");
}

#[derive(Debug, Clone)]
enum Op {
    Reserve(usize),
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Reserve),
        (0usize..4).prop_map(Op::Release),
    ]
}

proptest! {
    /// Any interleaving keeps at most one reservation per pin, and the
    /// arbiter agrees with a simple model of which pins are held.
    #[test]
    fn prop_reservations_match_model(ops in prop::collection::vec(op(), 1..64)) {
        let pins = board_pins();
        let arbiter = PinArbiter::new();
        let mut tokens: Vec<Option<_>> = (0..4).map(|_| None).collect();

        for op in ops {
            match op {
                Op::Reserve(i) => {
                    let result = arbiter.reserve(&pins[i], ChannelConfigurationType::DigitalInput);
                    prop_assert_eq!(result.is_ok(), tokens[i].is_none());
                    if let Ok(token) = result {
                        tokens[i] = Some(token);
                    }
                }
                Op::Release(i) => {
                    if let Some(token) = tokens[i].take() {
                        prop_assert!(arbiter.release(token).is_ok());
                    }
                }
            }
            let held = tokens.iter().filter(|t| t.is_some()).count();
            prop_assert_eq!(arbiter.reserved_count(), held);
        }
    }
}
