// ABOUTME: The 8-byte message header shared by every wire message
// ABOUTME: protocol_version (u8) + padding (u8) + type (u16) + size (u32), all little-endian

use super::WireError;
use bytes::{Buf, BufMut, BytesMut};
use num_enum::TryFromPrimitive;
use std::io::Cursor;

/// The only protocol version this agent speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// Message kinds carried in the header's `type` field.
///
/// Mirrors the reference SPICE stream-device message identifiers; only the
/// subset this core engine needs to marshal is represented here.
#[derive(TryFromPrimitive, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    Capabilities = 1,
    NotifyError = 2,
    StartStop = 3,
    Format = 4,
    Data = 5,
    Cursor = 6,
}

/// Decoded fixed header, common to every message in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub protocol_version: u8,
    pub message_type: MessageType,
    pub size: u32,
}

impl Header {
    pub const SIZE: usize = 8;
}

/// Encode a header for an outbound message with the given body length.
///
/// `protocol_version` is always the current constant; `padding` is always
/// zero on send, per the wire contract.
pub fn encode_header(message_type: MessageType, body_len: u32) -> [u8; Header::SIZE] {
    let mut buf = BytesMut::with_capacity(Header::SIZE);
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(0); // padding
    buf.put_u16_le(message_type as u16);
    buf.put_u32_le(body_len);

    let mut out = [0u8; Header::SIZE];
    out.copy_from_slice(&buf);
    out
}

/// Decode a header from exactly 8 bytes already read off the wire.
///
/// Fails with [`WireError::BadVersion`] if `protocol_version` does not match
/// the constant, or [`WireError::UnknownType`] if `type` is not one of the
/// recognized [`MessageType`] values. Neither failure consumes any further
/// bytes; the caller treats both as fatal protocol errors.
pub fn decode_header(bytes: &[u8; Header::SIZE]) -> Result<Header, WireError> {
    let mut cur = Cursor::new(&bytes[..]);
    let protocol_version = cur.get_u8();
    let _padding = cur.get_u8();
    let raw_type = cur.get_u16_le();
    let size = cur.get_u32_le();

    if protocol_version != PROTOCOL_VERSION {
        return Err(WireError::BadVersion {
            expected: PROTOCOL_VERSION,
            actual: protocol_version,
        });
    }

    let message_type =
        MessageType::try_from_primitive(raw_type).map_err(|_| WireError::UnknownType(raw_type))?;

    Ok(Header {
        protocol_version,
        message_type,
        size,
    })
}
