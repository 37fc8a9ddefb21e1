//! Tests for the logging helpers.

use periph_hal::logging::{init_logger, init_logger_with_level, log_debug, log_error, log_info, log_warn};
use periph_hal::util::{log_frame_hex, LogThrottle};

/// Logging helpers must not panic, with or without a logger installed.
#[test]
fn test_logging() {
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
    log_frame_hex("TX", &[0u8; 200]);
}

/// Initializing twice is harmless.
#[test]
fn test_init_logger() {
    init_logger();
    init_logger_with_level(log::LevelFilter::Debug);
    log_frame_hex("RX", &[0x01, 0x02]);
}

#[test]
fn test_throttle_caps_messages() {
    let mut throttle = LogThrottle::new(60_000, 3);
    let allowed = (0..10).filter(|_| throttle.allow()).count();
    assert_eq!(allowed, 3);
    assert_eq!(throttle.suppressed(), 7);

    throttle.reset();
    assert_eq!(throttle.suppressed(), 0);
    assert!(throttle.allow());
}
