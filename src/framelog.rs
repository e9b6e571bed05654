// ABOUTME: Frame log (A4) — append-only diagnostic sink for captured frame bytes and timing
// ABOUTME: A no-op sink when no path is configured; format has no stability guarantee

use crate::error::ConfigError;
use crate::hexdump::hex_dump;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Default category used by [`FrameLog::record_frame`], the convenience
/// entry point the capture loop calls after every emitted frame.
const FRAME_CATEGORY: &str = "frames";

struct Sink {
    file: Mutex<File>,
    log_binary: bool,
    categories: HashSet<String>,
}

/// Diagnostic frame-log writer.
///
/// Constructed once at startup from the CLI's `-l`/`--log-binary`/
/// `--log-categories` flags and shared (by reference) with the capture loop.
/// With no path configured, every call is a no-op — this is a debug aid, not
/// part of the protocol.
pub struct FrameLog {
    sink: Option<Sink>,
    last_frame_at: Mutex<Option<Instant>>,
}

impl FrameLog {
    /// Open (creating if absent) an append-only file at `path`, with binary
    /// logging and category filtering per the CLI flags. `path = None`
    /// produces a no-op sink equivalent to [`FrameLog::disabled`].
    pub fn new(
        path: Option<&Path>,
        log_binary: bool,
        categories: HashSet<String>,
    ) -> Result<Self, ConfigError> {
        let sink = match path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| ConfigError::FrameLogUnwritable {
                        path: path.display().to_string(),
                        source,
                    })?;
                Some(Sink {
                    file: Mutex::new(file),
                    log_binary,
                    categories,
                })
            }
            None => None,
        };

        Ok(FrameLog {
            sink,
            last_frame_at: Mutex::new(None),
        })
    }

    /// A frame log that discards everything; used when no `-l` path is
    /// configured, and by tests that don't care about diagnostic output.
    pub fn disabled() -> Self {
        FrameLog {
            sink: None,
            last_frame_at: Mutex::new(None),
        }
    }

    /// Convenience entry point for the capture loop: records one frame under
    /// the built-in `"frames"` category, with the latency since the last
    /// recorded frame as the timing figure.
    pub fn record_frame(&self, codec: u8, width: u32, height: u32, buffer: &[u8]) {
        let now = Instant::now();
        let elapsed = {
            let mut last = self.last_frame_at.lock().expect("frame log poisoned");
            let elapsed = last.map(|prev| now.duration_since(prev));
            *last = Some(now);
            elapsed
        };
        self.record(FRAME_CATEGORY, codec, width, height, buffer.len(), elapsed, buffer);
    }

    /// Append a structured metadata line for `category`, plus a hex dump of
    /// `bytes` when binary logging is enabled. No-op if the log is disabled
    /// or `category` was not in the enabled set.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        category: &str,
        codec: u8,
        width: u32,
        height: u32,
        size: usize,
        elapsed: Option<Duration>,
        bytes: &[u8],
    ) {
        let Some(sink) = &self.sink else { return };
        if !sink.categories.is_empty() && !sink.categories.contains(category) {
            return;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let mut file = sink.file.lock().expect("frame log poisoned");
        let _ = writeln!(
            file,
            "{timestamp} {category} codec={codec} {width}x{height} size={size} latency_ms={:?}",
            elapsed.map(|d| d.as_millis())
        );

        if sink.log_binary {
            let _ = hex_dump(bytes, &mut *file);
        }
    }
}
