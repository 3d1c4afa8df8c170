use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Parse a console level name. `"off"`/`"none"` disable output, unknown names fall back to info.
pub fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Install a console subscriber writing to stderr.
///
/// `RUST_LOG` directives take precedence over `console_level`. Records from
/// the `log` crate are bridged into `tracing`.
pub fn init_logging(console_level: &str) {
    // Bridge `log` → `tracing` before installing the subscriber
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let default_level = parse_tracing_level(console_level)
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF);
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(console).try_init();
}
