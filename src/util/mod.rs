//! # Utility Modules
//!
//! Helpers shared across the HAL: hex formatting for frame dumps and MAC
//! addresses, rate-limited logging, and poison-tolerant locking.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact, format_mac_address, parse_mac_address, HexError};
pub use logging::{log_frame_hex, LogThrottle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the guard if a previous holder panicked.
///
/// Every mutex in the crate guards plain data with no invariants spanning a
/// panic, so continuing with the inner value is sound.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
