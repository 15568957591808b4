//! Configuration checks run before the dashboard starts.
//!
//! Schedules that can never succeed (zero intervals, a base URL reqwest cannot
//! reach) are reported as errors instead of being polled forever.

use crate::config::AppConfig;
use colored::Colorize;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// The dashboard refuses to start.
    Error,
    /// Startup proceeds.
    Warning,
}

/// One finding, keyed by the YAML path of the offending setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub level: IssueLevel,
    pub field: String,
    pub message: String,
}

/// Findings of one validation run.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    fn push(&mut self, level: IssueLevel, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            level,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(IssueLevel::Error, field, message);
    }

    pub fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(IssueLevel::Warning, field, message);
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.level == IssueLevel::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// True if any finding concerns `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    /// Prints warnings, then errors, or a single OK line.
    pub fn print(&self) {
        if self.issues.is_empty() {
            println!("  {} Configuration OK", "✓".green());
            return;
        }
        if self.has_warnings() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for issue in self.warnings() {
                println!("  {} {}: {}", "⚠".yellow(), issue.field.bold(), issue.message);
            }
        }
        if self.has_errors() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for issue in self.errors() {
                println!("  {} {}: {}", "✗".red(), issue.field.bold(), issue.message);
            }
        }
    }
}

/// Validates an [`AppConfig`].
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::check_api(config, &mut result);
        Self::check_polling(config, &mut result);
        Self::check_logging(config, &mut result);

        result
    }

    fn check_api(config: &AppConfig, result: &mut ValidationResult) {
        let base_url = config.api.base_url.trim();
        if base_url.is_empty() {
            result.error("api.base_url", "is empty");
        } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            result.error(
                "api.base_url",
                format!("'{}' must start with http:// or https://", base_url),
            );
        }

        if config.api.timeout_secs == 0 {
            result.error("api.timeout_secs", "must be greater than 0");
        }

        if !config.api.verify_tls {
            let message = if sn_connectors::http::can_disable_tls_verification() {
                "certificate verification is disabled; do not use this against production APIs"
            } else {
                "ignored in release builds; certificates will be verified"
            };
            result.warning("api.verify_tls", message);
        }
    }

    fn check_polling(config: &AppConfig, result: &mut ValidationResult) {
        let polling = &config.polling;
        let data_intervals = [
            ("polling.stats_interval_secs", polling.stats_interval_secs),
            ("polling.feed_interval_secs", polling.feed_interval_secs),
            ("polling.map_interval_secs", polling.map_interval_secs),
        ];

        for (field, value) in [("polling.health_interval_secs", polling.health_interval_secs)]
            .into_iter()
            .chain(data_intervals)
        {
            if value == 0 {
                result.error(field, "must be greater than 0");
            }
        }

        if polling.health_timeout_secs == 0 {
            result.error("polling.health_timeout_secs", "must be greater than 0");
        } else if polling.health_timeout_secs >= polling.health_interval_secs {
            result.warning(
                "polling.health_timeout_secs",
                format!(
                    "{}s is not shorter than the {}s health interval; slow probes will skip ticks",
                    polling.health_timeout_secs, polling.health_interval_secs
                ),
            );
        }

        if polling.poll_timeout_secs == 0 {
            result.error("polling.poll_timeout_secs", "must be greater than 0");
            return;
        }
        for (field, interval) in data_intervals {
            if interval > 0 && polling.poll_timeout_secs >= interval {
                result.warning(
                    field,
                    format!(
                        "{}s is not longer than polling.poll_timeout_secs ({}s); slow fetches will skip ticks",
                        interval, polling.poll_timeout_secs
                    ),
                );
            }
        }
    }

    fn check_logging(config: &AppConfig, result: &mut ValidationResult) {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            result.error(
                "logging.level",
                format!(
                    "'{}' is not one of: {}",
                    config.logging.level,
                    LEVELS.join(", ")
                ),
            );
        }
    }
}
