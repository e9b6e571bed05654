// ABOUTME: CLI surface (A1) — argh-based flag parsing, turned into a validated Config
// ABOUTME: parse_env overrides argh's own exit-0-on-help behavior so every early exit is non-zero

use crate::error::ConfigError;
use argh::FromArgs;
use std::collections::HashSet;
use std::path::PathBuf;

fn default_device_path() -> String {
    "/dev/virtio-ports/org.spice-space.stream.0".to_string()
}

/// Guest-side display streaming agent: captures frames, negotiates a codec,
/// and streams them to a host viewer over a duplex serial device.
#[derive(FromArgs, Debug)]
pub struct CliArgs {
    /// device path
    #[argh(option, short = 'p', default = "default_device_path()")]
    pub device: String,

    /// diagnostic frame log output file
    #[argh(option, short = 'l')]
    pub frame_log: Option<String>,

    /// write binary frames into the frame log
    #[argh(switch)]
    pub log_binary: bool,

    /// enable named log categories, colon-separated (cat1:cat2:...)
    #[argh(option)]
    pub log_categories: Option<String>,

    /// plugin discovery directory
    #[argh(option)]
    pub plugins_dir: Option<String>,

    /// debug log verbosity
    #[argh(switch, short = 'd')]
    pub debug: bool,

    /// plugin option, key=value; may be given more than once
    #[argh(option, short = 'c')]
    pub plugin_option: Vec<String>,
}

/// Validated configuration the supervisor builds everything else from.
#[derive(Debug)]
pub struct Config {
    pub device_path: String,
    pub frame_log_path: Option<PathBuf>,
    pub log_binary_frames: bool,
    pub log_categories: HashSet<String>,
    pub plugins_dir: Option<PathBuf>,
    pub debug: bool,
    pub plugin_options: Vec<(String, String)>,
}

impl Config {
    /// Parse from the real process arguments.
    ///
    /// Deliberately does not call `argh::from_env()`: its default behavior
    /// exits the process with status 0 on `-h`/`--help`, but the CLI surface
    /// (`-h`,`--help` — print usage, exit non-zero) wants every early exit —
    /// help included — to leave with a non-zero status. Driving
    /// `CliArgs::from_args` directly and handling `EarlyExit` ourselves keeps
    /// argh's own usage/help text rendering while fixing the exit code.
    pub fn parse_env() -> Result<Self, ConfigError> {
        let strings: Vec<String> = std::env::args().collect();
        let cmd = strings.first().map(String::as_str).unwrap_or("stream-agent");
        let rest: Vec<&str> = strings.iter().skip(1).map(String::as_str).collect();

        let args = match CliArgs::from_args(&[cmd], &rest) {
            Ok(args) => args,
            Err(early_exit) => {
                println!("{}", early_exit.output);
                std::process::exit(1);
            }
        };

        Self::from_args(args)
    }

    /// Validate a parsed [`CliArgs`] into a [`Config`], surfacing bad plugin
    /// option syntax as a `ConfigError` rather than panicking.
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let log_categories = args
            .log_categories
            .as_deref()
            .map(|s| s.split(':').filter(|c| !c.is_empty()).map(String::from).collect())
            .unwrap_or_default();

        let mut plugin_options = Vec::with_capacity(args.plugin_option.len());
        for raw in &args.plugin_option {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| ConfigError::MissingEquals(raw.clone()))?;
            plugin_options.push((key.to_string(), value.to_string()));
        }

        Ok(Config {
            device_path: args.device,
            frame_log_path: args.frame_log.map(PathBuf::from),
            log_binary_frames: args.log_binary,
            log_categories,
            plugins_dir: args.plugins_dir.map(PathBuf::from),
            debug: args.debug,
            plugin_options,
        })
    }
}
