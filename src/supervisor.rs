// ABOUTME: Session supervisor (C7) — wires every component together and owns the process lifecycle
// ABOUTME: Installs signal handlers, opens the device, launches the cursor thread, runs the capture loop

use crate::capture;
use crate::cli::Config;
use crate::cursor::{self, CursorSource};
use crate::error::AgentError;
use crate::framelog::FrameLog;
use crate::plugin::PluginRegistry;
use crate::plugins::loader;
use crate::plugins::mjpeg::{DisplaySurfaceFactory, MjpegPlugin};
use crate::port::StreamPort;
use crate::session::SessionState;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::Arc;
use tracing::{error, info};

/// Runs the agent to completion: installs signal handlers, builds every
/// ambient component from `config`, and drives the capture loop on the
/// calling thread until shutdown. Returns the process exit code per §6:
/// `0` on a clean signal-driven shutdown, non-zero on any uncaught error.
pub fn run(config: Config, display_factory: Box<dyn DisplaySurfaceFactory>, cursor_source: Box<dyn CursorSource>) -> i32 {
    let session = Arc::new(SessionState::new());

    if let Err(e) = install_signal_handlers(&session) {
        error!(error = %e, "failed to install signal handlers");
        return 1;
    }

    match run_inner(config, &session, display_factory, cursor_source) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "agent exiting on error");
            1
        }
    }
}

fn install_signal_handlers(session: &Arc<SessionState>) -> std::io::Result<()> {
    signal_hook::flag::register(SIGINT, session.quit_flag())?;
    signal_hook::flag::register(SIGTERM, session.quit_flag())?;
    Ok(())
}

fn run_inner(
    config: Config,
    session: &Arc<SessionState>,
    display_factory: Box<dyn DisplaySurfaceFactory>,
    cursor_source: Box<dyn CursorSource>,
) -> Result<(), AgentError> {
    let mut registry = PluginRegistry::new();
    registry.register(Box::new(MjpegPlugin::new(display_factory)));

    if let Some(dir) = &config.plugins_dir {
        match loader::load_dir(dir) {
            Ok(discovered) => {
                for plugin in discovered {
                    registry.register(plugin);
                }
            }
            Err(e) => return Err(AgentError::from(e)),
        }
    }

    for (key, value) in &config.plugin_options {
        registry.apply_option(key, value)?;
    }

    let frame_log = FrameLog::new(
        config.frame_log_path.as_deref(),
        config.log_binary_frames,
        config.log_categories.clone(),
    )?;

    let port = Arc::new(StreamPort::open(&config.device_path)?);

    info!(device = %config.device_path, "stream agent starting");

    let cursor_port = port.clone();
    let cursor_session = session.clone();
    let cursor_handle = std::thread::spawn(move || {
        cursor::run(&cursor_port, &cursor_session, cursor_source);
    });

    let result = capture::run(&port, session, &registry, &frame_log);

    // The cursor thread exits on its own once quit_requested is observed;
    // join it so the process doesn't exit while it's still mid-write.
    session.request_quit();
    let _ = cursor_handle.join();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptureError;
    use crate::plugins::mjpeg::DisplaySurface;
    use crate::wire::CursorMessage;
    use std::collections::HashSet;
    use std::time::Duration;

    struct NeverOpens;
    impl DisplaySurfaceFactory for NeverOpens {
        fn open(&self) -> Option<Box<dyn DisplaySurface>> {
            None
        }
    }

    struct NoCursorEvents;
    impl CursorSource for NoCursorEvents {
        fn next_event(&mut self, _timeout: Duration) -> Result<Option<CursorMessage>, CaptureError> {
            Ok(None)
        }
    }

    #[test]
    fn missing_device_path_is_reported_as_a_nonzero_exit() {
        let config = Config {
            device_path: "/nonexistent/stream-agent-test-device".to_string(),
            frame_log_path: None,
            log_binary_frames: false,
            log_categories: HashSet::new(),
            plugins_dir: None,
            debug: false,
            plugin_options: Vec::new(),
        };

        let code = run(config, Box::new(NeverOpens), Box::new(NoCursorEvents));
        assert_eq!(code, 1);
    }
}
