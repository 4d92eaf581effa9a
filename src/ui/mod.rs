//! User interface module - terminal output.
//!
//! - `formatter` - Formatting and printing of messages and reports
//! - This module - Logging setup shared by every subcommand

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_gate_report, display_stage_report, display_status, display_success,
    display_warning,
};

/// Maps the number of `-v` flags to a default log level.
pub fn default_log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level follows `verbosity`.
/// Logs go to stderr so stdout carries only command output.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbosity)));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}
