//! Sentinel CLI
//!
//! Terminal front end for the Sentinel Dash telemetry API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod commands;
mod config;
mod render;
mod validator;

use commands::{run_watch, WatchOptions};
use config::AppConfig;
use sn_connectors::HttpTelemetrySource;
use sn_core::{AnalysisSession, Connectivity, TelemetrySource, TurnContent, View};
use sn_observability::LoggingConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author = "Sentinel Dash Team")]
#[command(version)]
#[command(about = "Real-time security operations dashboard", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Telemetry API URL (overrides api.base_url)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live dashboard
    Watch {
        /// Initial view (overview, livefeed, threatmap, settings)
        #[arg(long, default_value = "overview")]
        view: View,
    },

    /// Analyze an IP address or domain
    Analyze {
        /// Indicator to analyze
        target: String,
    },

    /// Probe API connectivity once
    Health,

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path).unwrap_or_else(|_| {
        if cli.verbose {
            eprintln!("Using default configuration (no config file found)");
        }
        AppConfig::default()
    });
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }

    sn_observability::init_logging_with_config(logging_config(&config, cli.verbose));
    sn_observability::register_metrics();

    match cli.command {
        Commands::Watch { view } => cmd_watch(config, view, cli.format).await,
        Commands::Analyze { target } => cmd_analyze(config, &target, cli.format).await,
        Commands::Health => cmd_health(config, cli.format).await,
        Commands::Validate { config: cfg_path } => {
            cmd_validate(cfg_path.unwrap_or(config_path)).await
        }
        Commands::Init { force } => cmd_init(&config_path, force).await,
        Commands::Config { show_secrets } => cmd_config(config, show_secrets, cli.format).await,
    }
}

/// `--verbose` selects the development preset, `logging.json_format` the
/// production one; otherwise the configured level applies.
fn logging_config(config: &AppConfig, verbose: bool) -> LoggingConfig {
    if verbose {
        LoggingConfig {
            json_format: config.logging.json_format,
            ..LoggingConfig::development()
        }
    } else if config.logging.json_format {
        LoggingConfig {
            level: LoggingConfig::parse_level(&config.logging.level),
            ..LoggingConfig::production()
        }
    } else {
        LoggingConfig {
            level: LoggingConfig::parse_level(&config.logging.level),
            ..LoggingConfig::default()
        }
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "sentinel-dash", "sentinel") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/default.yaml")
    }
}

fn connect(config: &AppConfig) -> Result<Arc<dyn TelemetrySource>> {
    let source = HttpTelemetrySource::new(config.connector_config())
        .context("Failed to create telemetry connector")?;
    Ok(Arc::new(source))
}

async fn cmd_watch(config: AppConfig, view: View, format: OutputFormat) -> Result<()> {
    let validation_result = ConfigValidator::validate(&config);
    if validation_result.has_errors() {
        validation_result.print();
        println!();
        println!(
            "{}",
            "Dashboard startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    run_watch(config, WatchOptions { view, format }).await
}

async fn cmd_analyze(config: AppConfig, target: &str, format: OutputFormat) -> Result<()> {
    let session = AnalysisSession::new(connect(&config)?);

    let handle = match session.submit(target) {
        Ok(handle) => handle,
        Err(e) => {
            println!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    handle.await.context("Analysis task failed")?;

    let log = session.snapshot();
    let Some(turn) = log.last() else {
        anyhow::bail!("Analysis produced no answer");
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(turn)?);
        return Ok(());
    }

    match &turn.content {
        TurnContent::Result(result) => {
            let level = render::paint_severity(result.threat_level);
            let mut lines = result.report().lines().map(str::to_string).collect::<Vec<_>>();
            if let Some(line) = lines.iter_mut().find(|l| l.starts_with("Threat Level:")) {
                *line = format!("Threat Level: {}", level);
            }
            for line in lines {
                println!("{}", line);
            }
        }
        TurnContent::Failure { message } => {
            println!("{}", message.red());
            println!("API: {}", config.api.base_url);
            std::process::exit(1);
        }
        _ => println!("{}", turn.text()),
    }

    Ok(())
}

async fn cmd_health(config: AppConfig, format: OutputFormat) -> Result<()> {
    let source = connect(&config)?;
    let deadline = Duration::from_secs(config.polling.health_timeout_secs);

    let outcome = match tokio::time::timeout(deadline, source.probe_health()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(sn_core::FetchError::timed_out(deadline)),
    };
    let connectivity = if outcome.is_ok() {
        Connectivity::Online
    } else {
        Connectivity::Offline
    };

    if format == OutputFormat::Json {
        let status = serde_json::json!({
            "api": config.api.base_url,
            "connectivity": connectivity,
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", "API Health".bold());
        println!("──────────");
        println!("  API: {}", config.api.base_url.cyan());
        match &outcome {
            Ok(()) => println!("  Status: {}", "ONLINE".green().bold()),
            Err(e) => {
                println!("  Status: {}", "OFFLINE".red().bold());
                println!("  Reason: {}", e);
            }
        }
    }

    if !connectivity.is_online() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_validate(config_path: PathBuf) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    let polling = &config.polling;
    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  API: {}", config.api.base_url);
    println!(
        "  Health: every {}s (timeout {}s)",
        polling.health_interval_secs, polling.health_timeout_secs
    );
    println!(
        "  Stats / Feed / Map: every {}s / {}s / {}s (timeout {}s)",
        polling.stats_interval_secs,
        polling.feed_interval_secs,
        polling.map_interval_secs,
        polling.poll_timeout_secs
    );
    println!("  Log level: {}", config.logging.level);

    println!();
    if validation_result.has_errors() {
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

async fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            "✗".red(),
            config_path.display()
        );
        std::process::exit(1);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    AppConfig::default().save(config_path)?;
    println!(
        "{} Wrote default configuration to {}",
        "✓".green(),
        config_path.display().to_string().cyan()
    );
    Ok(())
}

async fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}
