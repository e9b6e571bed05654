// ABOUTME: Plugin registry (C4) — holds registered codec plugins, selects the best one for a client
// ABOUTME: Mirrors the teacher crate's PduRegistry shape: a flat table keyed by a small identifier

use crate::error::CaptureError;
use std::collections::HashSet;

/// Frame handed from a capture provider to the capture loop.
///
/// `buffer` already holds the encoded bytes for the provider's codec (e.g.
/// JPEG for the built-in MJPEG plugin) — the capture loop never re-encodes.
pub struct FrameInfo {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// True on the first frame of a session and whenever dimensions change,
    /// signaling the capture loop to emit a Format message before Data.
    pub stream_start: bool,
}

impl FrameInfo {
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}

/// An active capture provider, constructed by a [`Plugin`] once it has been
/// selected for the session.
pub trait FrameCapture: Send {
    /// Block (provider-defined, no timeout enforced per the spec) until the
    /// next frame is available.
    fn capture_frame(&mut self) -> Result<FrameInfo, CaptureError>;

    fn video_codec_type(&self) -> u8;
}

/// A registered plugin: something that can manufacture a [`FrameCapture`]
/// for a particular codec, at a particular rank.
///
/// Plugins are capability records rather than an inheritance hierarchy, per
/// the spec's design notes — this trait is the Rust rendition of that
/// `{ create_capture, rank, parse_options, video_codec_type }` tuple.
pub trait Plugin: Send + Sync {
    /// Construct a capture provider, or `None` if the provider cannot be
    /// created right now (e.g. the display surface isn't reachable) — the
    /// registry discards this plugin and retries the next-highest rank
    /// rather than treating it as fatal.
    fn create_capture(&self) -> Option<Box<dyn FrameCapture>>;

    /// Selection priority: higher wins. Ties are broken by registration
    /// order (first registered wins).
    fn rank(&self) -> u32;

    fn video_codec_type(&self) -> u8;

    /// Apply an operator-supplied `key=value` option. Unknown keys are
    /// silently ignored (a plugin simply returns `Ok(())` for keys it
    /// doesn't recognize); an invalid value for a recognized key is a fatal
    /// `ConfigError` at startup.
    fn parse_option(&mut self, key: &str, value: &str) -> Result<(), crate::error::ConfigError> {
        let _ = (key, value);
        Ok(())
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Holds every registered plugin and implements the selection algorithm from
/// §4.4: filter to client-accepted codecs, pick the highest rank (ties go to
/// registration order), and fall through to the next rank if
/// `create_capture` declines.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry { plugins: Vec::new() }
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        tracing::info!(name = plugin.name(), rank = plugin.rank(), "plugin registered");
        self.plugins.push(plugin);
    }

    /// Apply a CLI-supplied option to every registered plugin.
    pub fn apply_option(&mut self, key: &str, value: &str) -> Result<(), crate::error::ConfigError> {
        for plugin in &mut self.plugins {
            plugin.parse_option(key, value)?;
        }
        Ok(())
    }

    /// Run the selection algorithm against the set of codecs the client
    /// declared acceptable. Returns the constructed capture and the codec id
    /// it will emit, or `None` if no candidate could be constructed.
    pub fn select(&self, client_codecs: &HashSet<u8>) -> Option<(Box<dyn FrameCapture>, u8)> {
        let mut candidates: Vec<&Box<dyn Plugin>> = self
            .plugins
            .iter()
            .filter(|p| client_codecs.contains(&p.video_codec_type()))
            .collect();

        // Stable sort descending by rank: Vec::sort_by is stable, so ties
        // keep their original (registration) order, matching the spec's
        // tie-break rule.
        candidates.sort_by(|a, b| b.rank().cmp(&a.rank()));

        for plugin in candidates {
            if let Some(capture) = plugin.create_capture() {
                tracing::info!(name = plugin.name(), "plugin selected");
                return Some((capture, plugin.video_codec_type()));
            }
            tracing::warn!(name = plugin.name(), "plugin declined to construct a capture, trying next");
        }

        None
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
