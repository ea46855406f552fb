//! Diagnostic logging
//!
//! Logs are for debugging gocart itself and always go to stderr. Status lines
//! meant for the user are printed by `utils::terminal` and the test reporter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding an `EnvFilter` directive string
pub const LOG_ENV: &str = "GOCART_LOG";

/// Install the global subscriber
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "gocart=debug"
    } else {
        "warn"
    }
}
