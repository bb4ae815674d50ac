//! Tracing subscriber setup
//!
//! `RUST_LOG` always wins. Otherwise the level comes from the command line
//! verbosity, falling back to the configured level.

use tracing_subscriber::EnvFilter;

/// Effective level for the given verbosity flags
pub fn level_for(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Filter directive scoped to this crate and the HTTP layer
fn directive(level: &str) -> String {
    format!("warn,docbuddy={level},tower_http={level}")
}

/// Install the global subscriber; a second call is a no-op
pub fn init(verbose: u8, quiet: bool, configured: &str) {
    let level = level_for(verbose, quiet, configured);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(&level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
