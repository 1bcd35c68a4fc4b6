//! Terminal output and log setup.

use std::io::IsTerminal;

use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Disable colors when stdout is redirected.
pub fn init_colors() {
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

/// Install the stderr log subscriber (prefer RUST_LOG, fallback to `default_filter`).
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Print a step announcement.
pub fn print_step(message: &str) {
    println!("{} {}", "==>".cyan().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}
