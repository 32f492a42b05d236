//! Logging and tracing initialization.
//!
//! Logs go to stderr so command output on stdout stays clean for piping.
//! `RUST_LOG` overrides the level chosen here.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
    /// Long-running server; default level INFO instead of WARN
    pub service: bool,
}

impl From<&AppConfig> for LogConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            json: config.log_json,
            verbose: config.verbose,
            service: false,
        }
    }
}

fn default_filter(config: &LogConfig) -> String {
    let level = if config.verbose {
        Level::DEBUG
    } else if config.service {
        Level::INFO
    } else {
        Level::WARN
    };
    format!("dockpanel={}", level.as_str().to_lowercase())
}

/// Install the global subscriber. Call once, after config is loaded.
///
/// ```ignore
/// dockpanel::logging::init(LogConfig { verbose: true, ..Default::default() });
/// ```
pub fn init(config: LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(&config)));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}
