//! Logging setup for the command-line tool.
//!
//! The filter comes from `PARAKERN_LOG`, then `RUST_LOG`, then the
//! verbosity given on the command line. Output goes to stderr so that
//! specialized code written to stdout stays clean.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PARAKERN_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Filter directive for `-v` repetitions.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_LEVEL,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbose: u8) -> EnvFilter {
    for var in [LOG_ENV, "RUST_LOG"] {
        if let Ok(directives) = std::env::var(var) {
            if let Ok(filter) = EnvFilter::try_new(directives) {
                return filter;
            }
        }
    }
    EnvFilter::new(level_for_verbosity(verbose))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
