// ABOUTME: Per-message-type body encoding and decoding built on top of the fixed header
// ABOUTME: Covers Format, Data, Capabilities, NotifyError, StartStop and the Cursor family

use super::header::{encode_header, Header, MessageType};
use super::WireError;
use bytes::{Buf, BufMut, BytesMut};

/// Reference cap on an inbound Capabilities body (`STREAM_MSG_CAPABILITIES_MAX_BYTES`).
pub const CAPABILITIES_MAX_BYTES: usize = 1024;

/// Size in bytes of the fixed `error_code` prefix of a NotifyError body.
pub const NOTIFY_ERROR_CODE_SIZE: usize = 4;

/// Maximum UTF-8 text bytes allowed after the `error_code` prefix.
pub const NOTIFY_ERROR_MAX_TEXT_BYTES: usize = 1024;

/// Maximum legitimate StartStop body size: the `num_codecs` prefix byte plus
/// at most 255 codec-id bytes, since `num_codecs` is itself a single byte.
pub const STARTSTOP_MAX_BYTES: usize = 1 + u8::MAX as usize;

/// Encode a Format message: header followed by width, height, codec, and the
/// one byte of reference-layout padding that keeps the body 4-byte aligned.
pub fn encode_format(width: u32, height: u32, codec: u8) -> Vec<u8> {
    let body_len = 4 + 4 + 1 + 3; // width + height + codec + padding
    let mut out = BytesMut::with_capacity(Header::SIZE + body_len);
    out.put_slice(&encode_header(MessageType::Format, body_len as u32));
    out.put_u32_le(width);
    out.put_u32_le(height);
    out.put_u8(codec);
    out.put_bytes(0, 3);
    out.to_vec()
}

/// Encode just the header for a Data message; the caller appends the raw
/// frame buffer itself without copying it through this function.
pub fn encode_data_header(body_len: u32) -> [u8; Header::SIZE] {
    encode_header(MessageType::Data, body_len)
}

/// Encode the empty-body Capabilities reply sent in response to every
/// inbound Capabilities message.
pub fn encode_capabilities_reply() -> [u8; Header::SIZE] {
    encode_header(MessageType::Capabilities, 0)
}

/// Parsed StartStop payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartStop {
    pub streaming: bool,
    pub codecs: Vec<u8>,
}

/// Decode a StartStop body: one `num_codecs` byte followed by that many
/// codec-id bytes. `num_codecs` must not exceed the remaining body length.
pub fn decode_start_stop(body: &[u8]) -> Result<StartStop, WireError> {
    if body.is_empty() {
        return Err(WireError::MalformedStartStop {
            num_codecs: 0,
            body_len: body.len(),
        });
    }

    let num_codecs = body[0] as usize;
    let available = body.len() - 1;
    if num_codecs > available {
        return Err(WireError::MalformedStartStop {
            num_codecs,
            body_len: body.len(),
        });
    }

    Ok(StartStop {
        streaming: num_codecs != 0,
        codecs: body[1..1 + num_codecs].to_vec(),
    })
}

/// Encode a StartStop body back to wire bytes (used by tests asserting the
/// round-trip invariant in the spec: parse then re-emit yields the same
/// bytes).
pub fn encode_start_stop(value: &StartStop) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + value.codecs.len());
    out.push(value.codecs.len() as u8);
    out.extend_from_slice(&value.codecs);
    out
}

/// Parsed NotifyError payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub error_code: u32,
    pub message: String,
}

/// Decode a NotifyError body.
///
/// The body must be at least [`NOTIFY_ERROR_CODE_SIZE`] bytes; anything past
/// the code is treated as a (possibly null-terminated) UTF-8 message, capped
/// at [`NOTIFY_ERROR_MAX_TEXT_BYTES`]. A body exceeding the cap is truncated
/// to the cap for the returned message — see `control::handle_notify_error`
/// for the log-then-fail sequencing this enables.
pub fn decode_notify_error(body: &[u8]) -> Result<NotifyError, WireError> {
    if body.len() < NOTIFY_ERROR_CODE_SIZE {
        return Err(WireError::NotifyErrorTooSmall(body.len()));
    }

    let mut cur = bytes::Bytes::copy_from_slice(body);
    let error_code = cur.get_u32_le();

    let text_len = (body.len() - NOTIFY_ERROR_CODE_SIZE).min(NOTIFY_ERROR_MAX_TEXT_BYTES);
    let text_bytes = &body[NOTIFY_ERROR_CODE_SIZE..NOTIFY_ERROR_CODE_SIZE + text_len];
    let end = text_bytes.iter().position(|&b| b == 0).unwrap_or(text_len);
    let message = String::from_utf8_lossy(&text_bytes[..end]).into_owned();

    if body.len() > NOTIFY_ERROR_CODE_SIZE + NOTIFY_ERROR_MAX_TEXT_BYTES {
        // Caller logs `message` (already truncated to the cap above) before
        // propagating this as a fatal protocol error.
        return Err(WireError::OversizeNotifyError);
    }

    Ok(NotifyError { error_code, message })
}

/// Validate (but do not retain) an inbound Capabilities body.
pub fn check_capabilities_size(body_len: usize) -> Result<(), WireError> {
    if body_len > CAPABILITIES_MAX_BYTES {
        return Err(WireError::OversizeCapabilities);
    }
    Ok(())
}

/// Cursor-shape payloads emitted by the cursor updater (C6).
///
/// The reference agent distinguishes `StreamMsgCursorSet` (a full bitmap,
/// sent when the shape changes) from `StreamMsgCursorMove` (just a new
/// hotspot position); the core engine only needs to frame and serialize
/// whichever variant the windowing collaborator hands it.
#[derive(Debug, Clone)]
pub enum CursorMessage {
    Set {
        hotspot_x: u16,
        hotspot_y: u16,
        width: u16,
        height: u16,
        /// Packed RGBA pixels, `width * height * 4` bytes.
        pixels: Vec<u8>,
    },
    Move {
        x: u16,
        y: u16,
    },
}

const CURSOR_KIND_SET: u8 = 0;
const CURSOR_KIND_MOVE: u8 = 1;

/// Encode a cursor-shape-change message.
pub fn encode_cursor_set(hotspot_x: u16, hotspot_y: u16, width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
    let body_len = 1 + 2 + 2 + 2 + 2 + pixels.len();
    let mut out = BytesMut::with_capacity(Header::SIZE + body_len);
    out.put_slice(&encode_header(MessageType::Cursor, body_len as u32));
    out.put_u8(CURSOR_KIND_SET);
    out.put_u16_le(hotspot_x);
    out.put_u16_le(hotspot_y);
    out.put_u16_le(width);
    out.put_u16_le(height);
    out.put_slice(pixels);
    out.to_vec()
}

/// Encode a cursor-move message.
pub fn encode_cursor_move(x: u16, y: u16) -> Vec<u8> {
    let body_len = 1 + 2 + 2;
    let mut out = BytesMut::with_capacity(Header::SIZE + body_len);
    out.put_slice(&encode_header(MessageType::Cursor, body_len as u32));
    out.put_u8(CURSOR_KIND_MOVE);
    out.put_u16_le(x);
    out.put_u16_le(y);
    out.to_vec()
}
