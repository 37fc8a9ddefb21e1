//! # Hex Encoding Utilities
//!
//! Thin wrappers over the `hex` crate used for frame dumps in debug logs and
//! for parsing the textual MAC addresses found in configuration.
//!
//! ```rust
//! use periph_hal::util::hex::{format_mac_address, parse_mac_address};
//!
//! let mac = parse_mac_address("24:0A:C4:12:34:56").unwrap();
//! assert_eq!(mac, [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56]);
//! assert_eq!(format_mac_address(&mac), "24:0A:C4:12:34:56");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),

    #[error("MAC address must be 6 bytes, got {0}")]
    MacLength(usize),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex string to bytes. Whitespace is stripped first.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "0a 1b 2c" for log lines.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a MAC address written with `:`, `-` or no separators.
pub fn parse_mac_address(text: &str) -> Result<[u8; 6], HexError> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    let bytes = decode_hex(&digits)?;
    <[u8; 6]>::try_from(bytes.as_slice()).map_err(|_| HexError::MacLength(bytes.len()))
}

/// Format a MAC address as upper-case colon separated octets.
pub fn format_mac_address(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
