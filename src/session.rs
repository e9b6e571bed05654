// ABOUTME: Process-global session state shared between the control reader and the capture loop
// ABOUTME: One StreamPort, one session per process — a single shared record is the correct model here

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The mutable session record described in the spec's data model: a start/stop
/// flag, the set of codecs the remote last declared acceptable, and a
/// monotonic quit flag written by both signal handlers and the control
/// reader.
///
/// `streaming_requested` and `client_codecs` are written only by the control
/// reader and read only by the capture loop; both run on the main thread, so
/// a plain `Mutex` (rather than anything lock-free) is the right tool — it's
/// never contended. `quit_requested` is the one field touched from a signal
/// handler, so it gets an `AtomicBool` with relaxed ordering, matching the
/// spec's note that relaxed visibility is sufficient because every loop
/// rechecks it at the top of its iteration.
pub struct SessionState {
    inner: Mutex<Inner>,
    quit_requested: Arc<AtomicBool>,
}

struct Inner {
    streaming_requested: bool,
    client_codecs: HashSet<u8>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            inner: Mutex::new(Inner {
                streaming_requested: false,
                client_codecs: HashSet::new(),
            }),
            quit_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the underlying quit flag, shared (not copied) with the
    /// caller — used to register it directly with `signal_hook::flag`, so a
    /// signal handler can set it without going through `SessionState` at all.
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit_requested.clone()
    }

    /// Apply the side effects of a received StartStop message: replace
    /// `client_codecs` wholesale and set `streaming_requested` to whether any
    /// codecs were listed.
    pub fn apply_start_stop(&self, codecs: &[u8]) {
        let mut inner = self.inner.lock().expect("session state poisoned");
        inner.client_codecs = codecs.iter().copied().collect();
        inner.streaming_requested = !codecs.is_empty();
    }

    pub fn streaming_requested(&self) -> bool {
        self.inner.lock().expect("session state poisoned").streaming_requested
    }

    pub fn client_codecs(&self) -> HashSet<u8> {
        self.inner.lock().expect("session state poisoned").client_codecs.clone()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::Relaxed)
    }

    pub fn request_quit(&self) {
        self.quit_requested.store(true, Ordering::Relaxed);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_with_codecs_sets_streaming() {
        let state = SessionState::new();
        state.apply_start_stop(&[1, 3, 3]);
        assert!(state.streaming_requested());
        assert_eq!(state.client_codecs().len(), 2); // duplicates coalesced
    }

    #[test]
    fn start_stop_with_no_codecs_clears_streaming() {
        let state = SessionState::new();
        state.apply_start_stop(&[1, 2]);
        state.apply_start_stop(&[]);
        assert!(!state.streaming_requested());
        assert!(state.client_codecs().is_empty());
    }

    #[test]
    fn quit_is_monotonic() {
        let state = SessionState::new();
        assert!(!state.quit_requested());
        state.request_quit();
        assert!(state.quit_requested());
        // Nothing in the public API can clear it back to false.
        assert!(state.quit_requested());
    }
}
