//! # Coprocessor Wire Protocol
//!
//! Commands travel host to coprocessor as
//! `interface (u8) | function (u32 LE) | length (u32 LE) | payload`.
//! Every command is answered by a response header
//! `status (u32 LE) | length (u32 LE)` followed by `length` payload bytes.
//! Asynchronous events are fetched with a poll command and arrive as
//! `function (u32 LE) | status (u32 LE) | length (u32 LE) | payload`.
//!
//! Variable-length strings are encoded as a `u32` LE byte count followed by
//! UTF-8 bytes. The access point list is a `u32` record count, a `u32` blob
//! length and a blob of records whose size depends on the SSID length, so
//! each record's offset is computed from the size of the one before it.
//!
//! Decoding uses `nom` complete parsers. Any shortfall maps to
//! [`DecodeError::Truncated`]; a decode failure never touches session state.

use crate::constants::MAXIMUM_SPI_BUFFER_LENGTH;
use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    bytes::complete::take,
    combinator::{map, map_res},
    error::ErrorKind,
    multi::length_data,
    number::complete::{i8 as parse_i8, le_u32, u8 as parse_u8},
    IResult,
};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Bytes in a command header
pub const COMMAND_HEADER_LENGTH: usize = 9;

/// Bytes in a response header
pub const RESPONSE_HEADER_LENGTH: usize = 8;

/// Bytes in an event header
pub const EVENT_HEADER_LENGTH: usize = 12;

/// Fixed part of an encoded access point: SSID length prefix, BSSID,
/// two channels, RSSI, authentication mode and protocol mask
const ACCESS_POINT_FIXED_LENGTH: usize = 4 + 6 + 5;

/// System function that returns the oldest pending event, if any
pub const SYSTEM_POLL_EVENT: u32 = 1;

/// Errors raised while decoding coprocessor frames
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated {what}: {available} bytes available")]
    Truncated { what: &'static str, available: usize },

    #[error("Invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },

    #[error("Unknown event function 0x{0:08X}")]
    UnknownEvent(u32),

    #[error("Payload of {length} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { length: usize, max: usize },
}

fn finish<'a, T>(
    what: &'static str,
    input: &'a [u8],
    result: IResult<&'a [u8], T>,
) -> Result<(&'a [u8], T), DecodeError> {
    result.map_err(|e| match e {
        nom::Err::Incomplete(_) => DecodeError::Truncated {
            what,
            available: input.len(),
        },
        nom::Err::Error(e) | nom::Err::Failure(e) if e.code == ErrorKind::Eof => {
            DecodeError::Truncated {
                what,
                available: input.len(),
            }
        }
        nom::Err::Error(e) | nom::Err::Failure(e) => DecodeError::Invalid {
            what,
            reason: format!("{:?}", e.code),
        },
    })
}

fn string(input: &[u8]) -> IResult<&[u8], String> {
    map_res(length_data(le_u32), |bytes: &[u8]| {
        String::from_utf8(bytes.to_vec())
    })(input)
}

fn mac(input: &[u8]) -> IResult<&[u8], [u8; 6]> {
    map_res(take(6usize), <[u8; 6]>::try_from)(input)
}

fn command_fields(input: &[u8]) -> IResult<&[u8], (u8, u32, &[u8])> {
    let (input, interface) = parse_u8(input)?;
    let (input, function) = le_u32(input)?;
    let (input, payload) = length_data(le_u32)(input)?;
    Ok((input, (interface, function, payload)))
}

fn response_header_fields(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    let (input, status) = le_u32(input)?;
    let (input, length) = le_u32(input)?;
    Ok((input, (status, length)))
}

fn event_fields(input: &[u8]) -> IResult<&[u8], (u32, u32, &[u8])> {
    let (input, function) = le_u32(input)?;
    let (input, status) = le_u32(input)?;
    let (input, payload) = length_data(le_u32)(input)?;
    Ok((input, (function, status, payload)))
}

fn credentials_fields(input: &[u8]) -> IResult<&[u8], (String, String)> {
    let (input, ssid) = string(input)?;
    let (input, password) = string(input)?;
    Ok((input, (ssid, password)))
}

fn list_header(input: &[u8]) -> IResult<&[u8], (u32, &[u8])> {
    let (input, count) = le_u32(input)?;
    let (input, blob) = length_data(le_u32)(input)?;
    Ok((input, (count, blob)))
}

fn put_string(buf: &mut impl BufMut, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

fn check_length(length: usize) -> Result<(), DecodeError> {
    if length > MAXIMUM_SPI_BUFFER_LENGTH {
        return Err(DecodeError::PayloadTooLarge {
            length,
            max: MAXIMUM_SPI_BUFFER_LENGTH,
        });
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Subsystem a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Interface {
    System = 0,
    WiFi = 1,
}

/// WiFi commands and the events that complete them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WiFiFunction {
    StartWiFiInterface = 1,
    StopWiFiInterface = 2,
    GetAccessPoints = 3,
    ConnectToAccessPoint = 4,
    DisconnectFromAccessPoint = 5,
    SetAntenna = 6,
    ConnectToAccessPointEvent = 0x101,
    DisconnectFromAccessPointEvent = 0x102,
    StartWiFiInterfaceEvent = 0x103,
    StopWiFiInterfaceEvent = 0x104,
    NtpUpdateEvent = 0x105,
}

impl WiFiFunction {
    pub fn from_u32(value: u32) -> Option<Self> {
        use WiFiFunction::*;
        Some(match value {
            1 => StartWiFiInterface,
            2 => StopWiFiInterface,
            3 => GetAccessPoints,
            4 => ConnectToAccessPoint,
            5 => DisconnectFromAccessPoint,
            6 => SetAntenna,
            0x101 => ConnectToAccessPointEvent,
            0x102 => DisconnectFromAccessPointEvent,
            0x103 => StartWiFiInterfaceEvent,
            0x104 => StopWiFiInterfaceEvent,
            0x105 => NtpUpdateEvent,
            _ => return None,
        })
    }

    pub fn is_event(&self) -> bool {
        (*self as u32) & 0x100 != 0
    }
}

/// Status reported by the coprocessor for a command or event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    CompletedOk,
    Failure,
    InvalidInterface,
    InvalidFunction,
    CoprocessorNotResponding,
    EspWiFiNotStarted,
    AccessPointNotFound,
    AuthenticationFailed,
    Timeout,
    Other(u32),
}

impl StatusCode {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => StatusCode::CompletedOk,
            1 => StatusCode::Failure,
            2 => StatusCode::InvalidInterface,
            3 => StatusCode::InvalidFunction,
            4 => StatusCode::CoprocessorNotResponding,
            5 => StatusCode::EspWiFiNotStarted,
            6 => StatusCode::AccessPointNotFound,
            7 => StatusCode::AuthenticationFailed,
            8 => StatusCode::Timeout,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            StatusCode::CompletedOk => 0,
            StatusCode::Failure => 1,
            StatusCode::InvalidInterface => 2,
            StatusCode::InvalidFunction => 3,
            StatusCode::CoprocessorNotResponding => 4,
            StatusCode::EspWiFiNotStarted => 5,
            StatusCode::AccessPointNotFound => 6,
            StatusCode::AuthenticationFailed => 7,
            StatusCode::Timeout => 8,
            StatusCode::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == StatusCode::CompletedOk
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Other(code) => write!(f, "status {code}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Security used by an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthenticationMode {
    #[default]
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
    Unknown(u8),
}

impl AuthenticationMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => AuthenticationMode::Open,
            1 => AuthenticationMode::Wep,
            2 => AuthenticationMode::WpaPsk,
            3 => AuthenticationMode::Wpa2Psk,
            4 => AuthenticationMode::WpaWpa2Psk,
            5 => AuthenticationMode::Wpa2Enterprise,
            6 => AuthenticationMode::Wpa3Psk,
            7 => AuthenticationMode::Wpa2Wpa3Psk,
            other => AuthenticationMode::Unknown(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            AuthenticationMode::Open => 0,
            AuthenticationMode::Wep => 1,
            AuthenticationMode::WpaPsk => 2,
            AuthenticationMode::Wpa2Psk => 3,
            AuthenticationMode::WpaWpa2Psk => 4,
            AuthenticationMode::Wpa2Enterprise => 5,
            AuthenticationMode::Wpa3Psk => 6,
            AuthenticationMode::Wpa2Wpa3Psk => 7,
            AuthenticationMode::Unknown(other) => *other,
        }
    }
}

/// Antenna feeding the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntennaType {
    #[default]
    NotKnown,
    OnBoard,
    External,
}

// ----------------------------------------------------------------------------
// Frames
// ----------------------------------------------------------------------------

/// A host to coprocessor command
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    pub interface: Interface,
    pub function: u32,
    pub payload: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads may carry credentials.
        f.debug_struct("Command")
            .field("interface", &self.interface)
            .field("function", &self.function)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl Command {
    pub fn wifi(function: WiFiFunction, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            interface: Interface::WiFi,
            function: function as u32,
            payload: Zeroizing::new(payload.into()),
        }
    }

    pub fn poll_event() -> Self {
        Self {
            interface: Interface::System,
            function: SYSTEM_POLL_EVENT,
            payload: Zeroizing::new(Vec::new()),
        }
    }

    /// The WiFi function this command invokes, if it is a WiFi command.
    pub fn wifi_function(&self) -> Option<WiFiFunction> {
        match self.interface {
            Interface::WiFi => WiFiFunction::from_u32(self.function),
            Interface::System => None,
        }
    }

    /// Serialize the command. The buffer is wiped when dropped.
    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Vec::with_capacity(COMMAND_HEADER_LENGTH + self.payload.len());
        buf.put_u8(self.interface as u8);
        buf.put_u32_le(self.function);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        Zeroizing::new(buf)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let (_, (interface, function, payload)) =
            finish("command", frame, command_fields(frame))?;
        let interface = match interface {
            0 => Interface::System,
            1 => Interface::WiFi,
            other => {
                return Err(DecodeError::Invalid {
                    what: "command",
                    reason: format!("unknown interface {other}"),
                })
            }
        };
        Ok(Self {
            interface,
            function,
            payload: Zeroizing::new(payload.to_vec()),
        })
    }
}

/// Status and length preceding a response payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: StatusCode,
    pub length: usize,
}

impl ResponseHeader {
    pub fn decode(header: &[u8]) -> Result<Self, DecodeError> {
        let (_, (status, length)) =
            finish("response header", header, response_header_fields(header))?;
        let length = length as usize;
        check_length(length)?;
        Ok(Self {
            status: StatusCode::from_u32(status),
            length,
        })
    }
}

/// Coprocessor answer to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub payload: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, payload: impl Into<Bytes>) -> Self {
        Self {
            status,
            payload: payload.into(),
        }
    }

    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::CompletedOk, payload)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LENGTH + self.payload.len());
        buf.put_u32_le(self.status.as_u32());
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let header = ResponseHeader::decode(frame)?;
        let body = &frame[RESPONSE_HEADER_LENGTH.min(frame.len())..];
        if body.len() < header.length {
            return Err(DecodeError::Truncated {
                what: "response payload",
                available: body.len(),
            });
        }
        Ok(Self {
            status: header.status,
            payload: Bytes::copy_from_slice(&body[..header.length]),
        })
    }
}

/// An asynchronous notification from the coprocessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub function: WiFiFunction,
    pub status: StatusCode,
    pub payload: Bytes,
}

impl EventFrame {
    pub fn new(function: WiFiFunction, status: StatusCode, payload: impl Into<Bytes>) -> Self {
        Self {
            function,
            status,
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(EVENT_HEADER_LENGTH + self.payload.len());
        buf.put_u32_le(self.function as u32);
        buf.put_u32_le(self.status.as_u32());
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let (_, (function, status, payload)) = finish("event", frame, event_fields(frame))?;
        check_length(payload.len())?;
        let function = WiFiFunction::from_u32(function)
            .filter(WiFiFunction::is_event)
            .ok_or(DecodeError::UnknownEvent(function))?;

        Ok(Self {
            function,
            status: StatusCode::from_u32(status),
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

// ----------------------------------------------------------------------------
// Payloads
// ----------------------------------------------------------------------------

/// Network name and passphrase for a connect request. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WiFiCredentials {
    ssid: String,
    password: String,
}

impl fmt::Debug for WiFiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiFiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WiFiCredentials {
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Vec::with_capacity(8 + self.ssid.len() + self.password.len());
        put_string(&mut buf, &self.ssid);
        put_string(&mut buf, &self.password);
        Zeroizing::new(buf)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let (_, (ssid, password)) = finish("credentials", payload, credentials_fields(payload))?;
        Ok(Self { ssid, password })
    }
}

/// Encode a disconnect request.
pub fn encode_disconnect_request(turn_off_interface: bool) -> Vec<u8> {
    vec![u8::from(turn_off_interface)]
}

/// Encode an antenna change. `NotKnown` has no wire value.
pub fn encode_set_antenna_request(antenna: AntennaType, persist: bool) -> Option<Vec<u8>> {
    let wire = match antenna {
        AntennaType::OnBoard => 0,
        AntennaType::External => 1,
        AntennaType::NotKnown => return None,
    };
    Some(vec![wire, u8::from(persist)])
}

/// Details carried by a "connected" event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectEventData {
    pub ssid: String,
    pub bssid: [u8; 6],
    pub channel: u8,
    pub authentication: AuthenticationMode,
}

impl ConnectEventData {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.ssid.len() + 8);
        put_string(&mut buf, &self.ssid);
        buf.put_slice(&self.bssid);
        buf.put_u8(self.channel);
        buf.put_u8(self.authentication.as_u8());
        buf.freeze()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let (_, data) = finish("connect event", payload, connect_event(payload))?;
        Ok(data)
    }
}

/// One access point reported by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiFiNetwork {
    pub ssid: String,
    pub bssid: [u8; 6],
    pub primary_channel: u8,
    pub secondary_channel: u8,
    pub rssi: i8,
    pub authentication: AuthenticationMode,
    /// 802.11 b/g/n/lr bitmask
    pub protocols: u8,
}

impl WiFiNetwork {
    /// Bytes this record occupies in an access point list.
    pub fn encoded_size(&self) -> usize {
        ACCESS_POINT_FIXED_LENGTH + self.ssid.len()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        put_string(buf, &self.ssid);
        buf.put_slice(&self.bssid);
        buf.put_u8(self.primary_channel);
        buf.put_u8(self.secondary_channel);
        buf.put_i8(self.rssi);
        buf.put_u8(self.authentication.as_u8());
        buf.put_u8(self.protocols);
    }
}

fn connect_event(input: &[u8]) -> IResult<&[u8], ConnectEventData> {
    let (input, ssid) = string(input)?;
    let (input, bssid) = mac(input)?;
    let (input, channel) = parse_u8(input)?;
    let (input, authentication) = map(parse_u8, AuthenticationMode::from_u8)(input)?;
    Ok((
        input,
        ConnectEventData {
            ssid,
            bssid,
            channel,
            authentication,
        },
    ))
}

fn access_point(input: &[u8]) -> IResult<&[u8], WiFiNetwork> {
    let (input, ssid) = string(input)?;
    let (input, bssid) = mac(input)?;
    let (input, primary_channel) = parse_u8(input)?;
    let (input, secondary_channel) = parse_u8(input)?;
    let (input, rssi) = parse_i8(input)?;
    let (input, authentication) = map(parse_u8, AuthenticationMode::from_u8)(input)?;
    let (input, protocols) = parse_u8(input)?;
    Ok((
        input,
        WiFiNetwork {
            ssid,
            bssid,
            primary_channel,
            secondary_channel,
            rssi,
            authentication,
            protocols,
        },
    ))
}

/// Encode a scan result.
pub fn encode_access_point_list(networks: &[WiFiNetwork]) -> Bytes {
    let blob_length: usize = networks.iter().map(WiFiNetwork::encoded_size).sum();
    let mut buf = BytesMut::with_capacity(8 + blob_length);
    buf.put_u32_le(networks.len() as u32);
    buf.put_u32_le(blob_length as u32);
    for network in networks {
        network.encode_into(&mut buf);
    }
    buf.freeze()
}

/// Decode a scan result.
pub fn decode_access_point_list(payload: &[u8]) -> Result<Vec<WiFiNetwork>, DecodeError> {
    let (_, (count, blob)) = finish("access point list", payload, list_header(payload))?;
    let count = count as usize;

    let mut networks = Vec::with_capacity(count.min(blob.len() / ACCESS_POINT_FIXED_LENGTH));
    let mut offset = 0;
    for _ in 0..count {
        let record = &blob[offset.min(blob.len())..];
        let (_, network) = finish("access point", record, access_point(record))?;
        offset += network.encoded_size();
        networks.push(network);
    }
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(ssid: &str, rssi: i8) -> WiFiNetwork {
        WiFiNetwork {
            ssid: ssid.to_string(),
            bssid: [0x24, 0x0A, 0xC4, 0x00, 0x01, rssi as u8],
            primary_channel: 6,
            secondary_channel: 0,
            rssi,
            authentication: AuthenticationMode::Wpa2Psk,
            protocols: 0x07,
        }
    }

    #[test]
    fn test_command_layout() {
        let command = Command::wifi(WiFiFunction::SetAntenna, vec![1, 0]);
        let frame = command.encode();
        assert_eq!(&frame[..], &[1, 6, 0, 0, 0, 2, 0, 0, 0, 1, 0]);
        assert_eq!(Command::decode(&frame).unwrap(), command);
    }

    #[test]
    fn test_credentials_layout() {
        let frame = WiFiCredentials::new("lab", "").encode();
        assert_eq!(&frame[..], &[3, 0, 0, 0, b'l', b'a', b'b', 0, 0, 0, 0]);
        assert_eq!(WiFiCredentials::decode(&frame).unwrap().ssid(), "lab");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let text = format!("{:?}", WiFiCredentials::new("lab", "hunter2"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_records_of_different_lengths() {
        let networks = vec![network("a", -40), network("a-much-longer-name", -71)];
        let encoded = encode_access_point_list(&networks);
        assert_eq!(
            encoded.len(),
            8 + networks[0].encoded_size() + networks[1].encoded_size()
        );
        assert_eq!(decode_access_point_list(&encoded).unwrap(), networks);
    }

    #[test]
    fn test_access_point_list_count_exceeds_blob() {
        let mut encoded = encode_access_point_list(&[network("one", -50)]).to_vec();
        encoded[0] = 2;
        assert!(matches!(
            decode_access_point_list(&encoded),
            Err(DecodeError::Truncated {
                what: "access point",
                ..
            })
        ));
    }

    #[test]
    fn test_event_rejects_command_function() {
        let mut frame = EventFrame::new(
            WiFiFunction::NtpUpdateEvent,
            StatusCode::CompletedOk,
            Bytes::new(),
        )
        .encode()
        .to_vec();
        frame[0] = WiFiFunction::GetAccessPoints as u8;
        frame[1] = 0;
        assert_eq!(
            EventFrame::decode(&frame),
            Err(DecodeError::UnknownEvent(WiFiFunction::GetAccessPoints as u32))
        );
    }

    #[test]
    fn test_response_header_limit() {
        let mut header = Vec::new();
        header.put_u32_le(0);
        header.put_u32_le(MAXIMUM_SPI_BUFFER_LENGTH as u32 + 1);
        assert!(matches!(
            ResponseHeader::decode(&header),
            Err(DecodeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_antenna_request() {
        assert_eq!(
            encode_set_antenna_request(AntennaType::External, true),
            Some(vec![1, 1])
        );
        assert_eq!(encode_set_antenna_request(AntennaType::NotKnown, true), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::from_u32(7), StatusCode::AuthenticationFailed);
        assert_eq!(StatusCode::from_u32(99), StatusCode::Other(99));
        assert_eq!(StatusCode::Other(99).as_u32(), 99);
    }
}
