// ABOUTME: Capture loop (C5) — drives the selected provider, emits Format+Data, polls control
// ABOUTME: State machine: IDLE <-> CAPTURING, either terminating on quit_requested

use crate::control;
use crate::error::{AgentError, CaptureError};
use crate::framelog::FrameLog;
use crate::plugin::{FrameCapture, PluginRegistry};
use crate::port::StreamPort;
use crate::session::SessionState;
use crate::wire::{self};
use tracing::{info, info_span, warn};

/// Runs the capture loop on the calling thread until `session.quit_requested()`.
///
/// This is the main task's body once startup (§4.7 steps 1-4) has completed
/// and the cursor updater has been launched; it owns the IDLE/CAPTURING
/// state machine described in the spec.
pub fn run(
    port: &StreamPort,
    session: &SessionState,
    registry: &PluginRegistry,
    frame_log: &FrameLog,
) -> Result<(), AgentError> {
    let span = info_span!("capture_loop");
    let _guard = span.enter();

    while !session.quit_requested() {
        if !session.streaming_requested() {
            run_idle(port, session)?;
            continue;
        }

        run_capturing(port, session, registry, frame_log)?;
    }

    info!("capture loop exiting on quit_requested");
    Ok(())
}

/// IDLE iteration: block on control reads; every message received
/// re-evaluates `streaming_requested` and `quit_requested`.
fn run_idle(port: &StreamPort, session: &SessionState) -> Result<(), AgentError> {
    control::poll_and_dispatch(port, session).map_err(AgentError::from)?;
    Ok(())
}

/// CAPTURING: acquire a provider via the registry, then loop frames until
/// streaming is turned off, quit is requested, or the provider errors.
fn run_capturing(
    port: &StreamPort,
    session: &SessionState,
    registry: &PluginRegistry,
    frame_log: &FrameLog,
) -> Result<(), AgentError> {
    let client_codecs = session.client_codecs();
    let Some((mut capture, codec)) = registry.select(&client_codecs) else {
        warn!("no plugin available for the client's accepted codecs");
        return Err(AgentError::NoCaptureAvailable);
    };
    info!(codec, "capture session starting");

    while session.streaming_requested() && !session.quit_requested() {
        let frame = capture
            .capture_frame()
            .map_err(|e: CaptureError| AgentError::Capture(e))?;

        let format = frame
            .stream_start
            .then(|| wire::encode_format(frame.width, frame.height, codec));
        let header = wire::encode_data_header(frame.buffer_size() as u32);
        if let Err(e) = port.write_frame(format.as_deref(), &header, &frame.buffer) {
            warn!(error = %e, "write failed sending frame, dropping back to IDLE");
            return Ok(());
        }

        frame_log.record_frame(codec, frame.width, frame.height, &frame.buffer);

        // Drain any pending control without delaying the next capture.
        control::try_dispatch(port, session).map_err(AgentError::from)?;
    }

    info!("capture session stopping");
    Ok(())
}
