// ABOUTME: Cursor updater (C6) — independent producer, writes cursor-shape messages under the shared mutex
// ABOUTME: Runs for the session lifetime on its own thread, joined by the supervisor at shutdown

use crate::error::CaptureError;
use crate::port::StreamPort;
use crate::session::SessionState;
use crate::wire::{self, CursorMessage};
use std::time::Duration;
use tracing::{debug, info_span, warn};

/// How long [`CursorSource::next_event`] may block before returning `None`,
/// so the updater's loop gets a chance to recheck `quit_requested` even when
/// the host surface is idle.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Source of cursor-shape change events from the host windowing surface.
///
/// An external collaborator per the spec — this crate only defines the
/// contract and drives it; providing a real implementation (reading guest
/// cursor state) is outside this core.
pub trait CursorSource: Send {
    /// Block up to `timeout` for the next cursor event. Returns `None` on
    /// timeout with no change, which is expected and not an error.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<CursorMessage>, CaptureError>;
}

/// Runs the cursor updater on the calling thread until `session.quit_requested()`.
///
/// Spawned and joined by the supervisor; writes interleave freely with
/// Format/Data on the wire because every write goes through the shared
/// `StreamPort` mutex, which guarantees each message is delivered atomically.
pub fn run(port: &StreamPort, session: &SessionState, mut source: Box<dyn CursorSource>) {
    let span = info_span!("cursor_updater");
    let _guard = span.enter();

    while !session.quit_requested() {
        match source.next_event(POLL_TIMEOUT) {
            Ok(Some(message)) => {
                let bytes = match &message {
                    CursorMessage::Set { hotspot_x, hotspot_y, width, height, pixels } => {
                        wire::encode_cursor_set(*hotspot_x, *hotspot_y, *width, *height, pixels)
                    }
                    CursorMessage::Move { x, y } => wire::encode_cursor_move(*x, *y),
                };
                if let Err(e) = port.write_all(&bytes) {
                    warn!(error = %e, "failed to write cursor update");
                }
            }
            Ok(None) => {
                debug!("no cursor event within poll window");
            }
            Err(e) => {
                warn!(error = %e, "cursor source failed, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::{FromRawFd, IntoRawFd};
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct OneShotSource {
        emitted: Arc<AtomicUsize>,
    }

    impl CursorSource for OneShotSource {
        fn next_event(&mut self, _timeout: Duration) -> Result<Option<CursorMessage>, CaptureError> {
            if self.emitted.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Some(CursorMessage::Move { x: 10, y: 20 }))
            } else {
                Ok(None)
            }
        }
    }

    fn port_pair() -> (StreamPort, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        let file = unsafe { File::from_raw_fd(a.into_raw_fd()) };
        (StreamPort::from_file(file), b)
    }

    #[test]
    fn emits_a_cursor_move_message_on_the_wire() {
        let (port, mut peer) = port_pair();
        let session = Arc::new(SessionState::new());
        let emitted = Arc::new(AtomicUsize::new(0));
        let source = Box::new(OneShotSource { emitted });

        let session_for_thread = session.clone();
        let handle = std::thread::spawn(move || {
            run(&port, &session_for_thread, source);
            port
        });

        let mut header = [0u8; 8];
        peer.read_exact(&mut header).unwrap();
        assert_eq!(header[2], 6); // MessageType::Cursor

        session.request_quit();
        let _ = handle.join();
    }
}
