// ABOUTME: Wire codec for the stream-device protocol: fixed 8-byte header plus per-type bodies
// ABOUTME: Pure functions over byte buffers, no I/O; StreamPort and the control reader build on top

mod header;
mod messages;

pub use header::{decode_header, encode_header, Header, MessageType, PROTOCOL_VERSION};
pub use messages::{
    check_capabilities_size, decode_notify_error, decode_start_stop, encode_capabilities_reply,
    encode_cursor_move, encode_cursor_set, encode_data_header, encode_format, encode_start_stop,
    CursorMessage, NotifyError, StartStop, CAPABILITIES_MAX_BYTES, NOTIFY_ERROR_CODE_SIZE,
    NOTIFY_ERROR_MAX_TEXT_BYTES, STARTSTOP_MAX_BYTES,
};

use thiserror::Error;

/// Errors raised while decoding bytes already read off the wire.
///
/// These are always fatal to the session: the protocol has no delimiter to
/// resynchronize on, so a malformed header or body ends the connection.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("bad protocol version: expected {expected}, got {actual}")]
    BadVersion { expected: u8, actual: u8 },

    #[error("unknown message type: {0:#x}")]
    UnknownType(u16),

    #[error("malformed start/stop body: num_codecs {num_codecs} exceeds body length {body_len}")]
    MalformedStartStop { num_codecs: usize, body_len: usize },

    #[error("notify_error body too small: {0} bytes, need at least {NOTIFY_ERROR_CODE_SIZE}")]
    NotifyErrorTooSmall(usize),

    #[error("notify_error body exceeds cap of {NOTIFY_ERROR_CODE_SIZE} + {NOTIFY_ERROR_MAX_TEXT_BYTES} bytes")]
    OversizeNotifyError,

    #[error("capabilities body exceeds cap of {CAPABILITIES_MAX_BYTES} bytes")]
    OversizeCapabilities,
}
