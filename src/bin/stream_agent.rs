// ABOUTME: Process entry point — parses CLI flags, wires up logging, and hands off to the supervisor
// ABOUTME: Real pixel-grab and cursor-event sources are external collaborators; see stream_agent::plugins

use std::time::Duration;
use stream_agent::cli::Config;
use stream_agent::cursor::CursorSource;
use stream_agent::error::CaptureError;
use stream_agent::plugins::mjpeg::{DisplaySurface, DisplaySurfaceFactory};
use stream_agent::wire::CursorMessage;
use tracing_subscriber::EnvFilter;

/// Placeholder display surface factory: the real pixel-grabbing backend for
/// a given guest windowing system is an external collaborator this crate
/// only defines the contract for (§4.11). Always declines, which simply
/// means the built-in MJPEG plugin is skipped during selection until a real
/// surface factory is wired in for the target platform.
struct UnavailableDisplaySurfaceFactory;

impl DisplaySurfaceFactory for UnavailableDisplaySurfaceFactory {
    fn open(&self) -> Option<Box<dyn DisplaySurface>> {
        None
    }
}

/// Placeholder cursor source: never produces an event. The real host
/// windowing integration is likewise an external collaborator (§4.6).
struct NoCursorEvents;

impl CursorSource for NoCursorEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<CursorMessage>, CaptureError> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

fn main() {
    let config = match Config::parse_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stream-agent: {e}");
            std::process::exit(1);
        }
    };

    init_logging(config.debug);

    let code = stream_agent::supervisor::run(
        config,
        Box::new(UnavailableDisplaySurfaceFactory),
        Box::new(NoCursorEvents),
    );
    std::process::exit(code);
}

fn init_logging(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
