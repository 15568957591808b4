//! Logging infrastructure for Sentinel Dash.
//!
//! Structured logging on `tracing`, plus the span macros the pollers and the
//! analysis session enter.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_target: true,
        }
    }
}

/// Crates whose events pass the default filter.
const WORKSPACE_CRATES: [&str; 4] = ["sn_core", "sn_connectors", "sn_cli", "sentinel"];

impl LoggingConfig {
    /// Verbose text output with span events and source locations.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            include_spans: true,
            include_location: true,
            ..Self::default()
        }
    }

    /// JSON lines at INFO, for log shipping.
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    /// Parses a textual level ("trace", "debug", ...), falling back to INFO.
    pub fn parse_level(level: &str) -> Level {
        level.parse().unwrap_or(Level::INFO)
    }

    fn default_directives(&self) -> String {
        WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr so that terminal views rendering on stdout stay readable. A second
/// call keeps the first subscriber.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let fmt_layer = if config.json_format {
        base.json().boxed()
    } else {
        base.boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

/// Creates a span for one stream's polling loop.
#[macro_export]
macro_rules! poll_span {
    ($stream:expr) => {
        tracing::info_span!("poll", stream = %$stream)
    };
    ($stream:expr, $($field:tt)*) => {
        tracing::info_span!("poll", stream = %$stream, $($field)*)
    };
}

/// Creates a span for one analysis request.
#[macro_export]
macro_rules! analysis_span {
    ($target:expr) => {
        tracing::info_span!("analysis", indicator = %$target)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, Level::INFO);
        assert!(config.json_format);
    }

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_spans);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(LoggingConfig::parse_level("debug"), Level::DEBUG);
        assert_eq!(LoggingConfig::parse_level("WARN"), Level::WARN);
        assert_eq!(LoggingConfig::parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_default_directives_cover_workspace_crates() {
        let directives = LoggingConfig::development().default_directives();
        assert!(directives.contains("sn_core=DEBUG"));
        assert!(directives.contains("sn_connectors=DEBUG"));
        assert!(directives.contains("sn_cli=DEBUG"));
        assert!(directives.contains("sentinel=DEBUG"));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logging_with_config(LoggingConfig::default());
        init_logging_with_config(LoggingConfig::production());
    }
}
