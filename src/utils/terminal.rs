//! Terminal output utilities

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!("{}: {}", style("error").red().bold(), message);
}

/// Print a warning message to stderr
pub fn print_warning(message: &str) {
    eprintln!("{}: {}", style("warning").yellow().bold(), message);
}

/// Print a cargo-style status line, e.g. `   Compiling example.com/m`
pub fn print_status(verb: &str, message: &str) {
    println!("{} {}", style(format!("{:>12}", verb)).green().bold(), message);
}

/// Create a spinner progress bar
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format a duration as `1.23s`, or `2m 3.45s` past one minute
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if duration < Duration::from_secs(60) {
        return format!("{:.2}s", secs);
    }
    let minutes = duration.as_secs() / 60;
    format!("{}m {:.2}s", minutes, secs - (minutes * 60) as f64)
}
