//! Tracing subscriber setup for the command-line binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info,batchscribe=debug";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// JSON lines instead of human-readable output.
    pub json_format: bool,
    /// Overrides `RUST_LOG` when set.
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Reads `LOG_FORMAT=json` from the environment.
    pub fn from_env() -> Self {
        let json_format = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Self {
            json_format,
            filter: None,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        }
    }
}

/// Installs the global subscriber. `log` records from dependencies are
/// forwarded into tracing. Calling this twice is a no-op.
pub fn init_logging(config: LoggingConfig) {
    tracing_log::LogTracer::init().ok();

    let env_filter = config.env_filter();
    let result = if config.json_format {
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_span_list(true)),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true)),
        )
    };

    if result.is_ok() {
        tracing::debug!(json_format = config.json_format, "Logging initialized");
    }
}
