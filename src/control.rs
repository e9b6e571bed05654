// ABOUTME: Control reader (C3) — parses inbound messages, mutates session state, replies to capabilities
// ABOUTME: Runs in blocking mode while idle and non-blocking mode between captured frames

use crate::port::StreamPort;
use crate::session::SessionState;
use crate::wire::{self, Header, MessageType, WireError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of one `poll_and_dispatch` call, so the capture loop and the
/// supervisor's idle loop can tell "nothing happened" apart from "something
/// happened" without inspecting session state themselves.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// No message was available (non-blocking mode only).
    Idle,
    /// A message was read and handled; session state may have changed.
    Handled,
}

/// Drains and dispatches inbound messages.
///
/// In blocking mode (`blocking = true`, used while the capture loop is
/// IDLE) this call waits indefinitely for the next message, bounded only by
/// the one-second poll/quit-recheck fallback described in the spec. In
/// non-blocking mode (used between captured frames) it returns
/// `ControlEvent::Idle` immediately if nothing is pending.
pub fn poll_and_dispatch(
    port: &StreamPort,
    session: &SessionState,
) -> Result<ControlEvent, WireError> {
    poll_and_dispatch_mode(port, session, true)
}

/// Same as [`poll_and_dispatch`] but never blocks: used between captured
/// frames so control traffic is drained without delaying output.
pub fn try_dispatch(
    port: &StreamPort,
    session: &SessionState,
) -> Result<ControlEvent, WireError> {
    poll_and_dispatch_mode(port, session, false)
}

fn poll_and_dispatch_mode(
    port: &StreamPort,
    session: &SessionState,
    blocking: bool,
) -> Result<ControlEvent, WireError> {
    loop {
        let timeout = if blocking { None } else { Some(Duration::ZERO) };
        let ready = port
            .poll_readable(if blocking { Some(Duration::from_secs(1)) } else { timeout })
            .unwrap_or(false);

        if !ready {
            if blocking {
                if session.quit_requested() {
                    return Ok(ControlEvent::Idle);
                }
                // Interrupted by a signal or the 1s fallback elapsed; loop
                // back around to recheck quit_requested, per the spec's
                // "sleeps one second and rechecks" bound on shutdown latency.
                continue;
            }
            return Ok(ControlEvent::Idle);
        }

        dispatch_one(port, session)?;
        return Ok(ControlEvent::Handled);
    }
}

fn dispatch_one(port: &StreamPort, session: &SessionState) -> Result<(), WireError> {
    let mut header_bytes = [0u8; Header::SIZE];
    if port.read_exact(&mut header_bytes).is_err() {
        // A read failure on the control path is fatal per the error design;
        // the supervisor treats quit_requested + a surfaced IOError as the
        // unwind path, so we set quit here and let the caller's I/O error
        // propagate via the PortError the next read attempt would hit. For
        // the purpose of this dispatch we mark quit so every other loop
        // notices promptly.
        session.request_quit();
        return Ok(());
    }

    let header = wire::decode_header(&header_bytes)?;

    match header.message_type {
        MessageType::Capabilities => {
            let Some(body) = read_capped_body(port, session, header.size, wire::CAPABILITIES_MAX_BYTES)? else {
                return Ok(());
            };
            wire::check_capabilities_size(header.size as usize)?;
            handle_capabilities(port, &body)?;
        }
        MessageType::NotifyError => {
            let cap = wire::NOTIFY_ERROR_CODE_SIZE + wire::NOTIFY_ERROR_MAX_TEXT_BYTES;
            let Some(body) = read_capped_body(port, session, header.size, cap)? else {
                return Ok(());
            };
            let oversize = header.size as usize > cap;
            handle_notify_error(&body, oversize)?;
        }
        MessageType::StartStop => {
            let Some(body) = read_capped_body(port, session, header.size, wire::STARTSTOP_MAX_BYTES)? else {
                return Ok(());
            };
            if header.size as usize > wire::STARTSTOP_MAX_BYTES {
                return Err(WireError::MalformedStartStop {
                    num_codecs: body.first().copied().unwrap_or(0) as usize,
                    body_len: header.size as usize,
                });
            }
            handle_start_stop(session, &body)?;
        }
        // Format, Data, and Cursor are outbound-only in this agent; a peer
        // sending one of them back is forward-compatible unknown traffic
        // from the agent's perspective, but since they *are* registered
        // MessageType values, treat this the same as any other inbound type
        // we don't expect: reject as unknown rather than silently drop. No
        // body is read for these — the connection is going fatal regardless.
        MessageType::Format | MessageType::Data | MessageType::Cursor => {
            return Err(WireError::UnknownType(header_bytes[2] as u16 | ((header_bytes[3] as u16) << 8)))
        }
    }

    Ok(())
}

/// Read a message body bounded by `cap`, regardless of what the host
/// declared in the header's `size` field.
///
/// Per §4.3, an oversize body is "read up to the cap" and then fails — never
/// trust `size` enough to allocate or read it verbatim, since it's an
/// untrusted u32 that could otherwise force a multi-gigabyte read. Returns
/// `Ok(None)` if the read itself failed (the caller has already requested
/// quit in that case and should return cleanly).
fn read_capped_body(
    port: &StreamPort,
    session: &SessionState,
    declared_size: u32,
    cap: usize,
) -> Result<Option<Vec<u8>>, WireError> {
    let read_len = (declared_size as usize).min(cap);
    let mut body = vec![0u8; read_len];
    if !body.is_empty() && port.read_exact(&mut body).is_err() {
        session.request_quit();
        return Ok(None);
    }
    Ok(Some(body))
}

fn handle_capabilities(port: &StreamPort, body: &[u8]) -> Result<(), WireError> {
    wire::check_capabilities_size(body.len())?;
    debug!(len = body.len(), "capabilities received, replying with empty body");
    let reply = wire::encode_capabilities_reply();
    if port.write_all(&reply).is_err() {
        warn!("failed to write capabilities reply");
    }
    Ok(())
}

/// `body` is already capped to at most `NOTIFY_ERROR_CODE_SIZE +
/// NOTIFY_ERROR_MAX_TEXT_BYTES` bytes by [`read_capped_body`]; `oversize`
/// tells us whether the host's declared `size` exceeded that cap, since the
/// capped body itself can no longer reveal that on its own.
fn handle_notify_error(body: &[u8], oversize: bool) -> Result<(), WireError> {
    match wire::decode_notify_error(body) {
        Ok(notify) => {
            error!(code = notify.error_code, message = %notify.message, "host reported stream error");
            if oversize {
                // Open question from the spec, resolved log-then-fail: the
                // message above is already the truncated-to-cap text, so by
                // the time we get here the log line is in place; now fail.
                return Err(WireError::OversizeNotifyError);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn handle_start_stop(session: &SessionState, body: &[u8]) -> Result<(), WireError> {
    let parsed = wire::decode_start_stop(body)?;
    info!(
        streaming = parsed.streaming,
        codecs = ?parsed.codecs,
        "start/stop received"
    );
    session.apply_start_stop(&parsed.codecs);
    Ok(())
}
