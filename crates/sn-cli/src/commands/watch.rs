//! Watch command - runs the live dashboard in the terminal.

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use sn_connectors::HttpTelemetrySource;
use sn_core::{Dashboard, SubmitRejected, TelemetrySource, View};

use crate::config::AppConfig;
use crate::render::{render_frame, DashboardFrame};
use crate::OutputFormat;

/// Options of the watch command.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// View shown on startup.
    pub view: View,
    pub format: OutputFormat,
}

/// A line typed at the dashboard prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `:view` switches the active view.
    Navigate(View),
    /// `:quit` or `:q`.
    Quit,
    /// Anything else is submitted for analysis.
    Analyze(String),
    /// Blank line.
    Empty,
    /// A `:` command that was not understood.
    Invalid(String),
}

/// Parses one prompt line.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line.strip_prefix(':') {
        Some("q") | Some("quit") => Input::Quit,
        Some(name) => match name.trim().parse::<View>() {
            Ok(view) => Input::Navigate(view),
            Err(e) => Input::Invalid(e),
        },
        None => Input::Analyze(line.to_string()),
    }
}

/// Runs the dashboard until Ctrl+C or `:quit`.
pub async fn run_watch(config: AppConfig, options: WatchOptions) -> Result<()> {
    let source: Arc<dyn TelemetrySource> = Arc::new(
        HttpTelemetrySource::new(config.connector_config())
            .context("Failed to create telemetry connector")?,
    );
    let dashboard = Dashboard::new(source, config.sync_config());
    dashboard.navigate(options.view);

    let mut health = dashboard.subscribe_health();
    let mut stats = dashboard.subscribe_stats();
    let mut feed = dashboard.subscribe_threat_feed();
    let mut map = dashboard.subscribe_threat_map();
    let mut session = dashboard.session().subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut notice: Option<String> = None;

    info!(api = %config.api.base_url, view = %options.view, "Starting live dashboard");
    dashboard.mount();
    draw(&dashboard, options.format, notice.as_deref())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = health.changed() => {}
            Ok(()) = stats.changed() => {}
            Ok(()) = feed.changed() => {}
            Ok(()) = map.changed() => {}
            Ok(()) = session.changed() => {}
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    None => {
                        debug!("stdin closed, input disabled");
                        stdin_open = false;
                        continue;
                    }
                    Some(line) => {
                        notice = None;
                        match parse_input(&line) {
                            Input::Quit => break,
                            Input::Empty => continue,
                            Input::Navigate(view) => dashboard.navigate(view),
                            Input::Invalid(message) => notice = Some(message),
                            Input::Analyze(target) => match dashboard.session().submit(&target) {
                                Ok(_) => {}
                                Err(SubmitRejected::InFlight) => {
                                    notice = Some("Analysis in progress, please wait".to_string());
                                }
                                Err(SubmitRejected::EmptyTarget) => continue,
                            },
                        }
                    }
                }
            }
        }
        draw(&dashboard, options.format, notice.as_deref())?;
    }

    dashboard.unmount();
    if options.format == OutputFormat::Text {
        println!("\n{}", "Dashboard stopped".yellow());
    }
    Ok(())
}

fn draw(dashboard: &Dashboard, format: OutputFormat, notice: Option<&str>) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&DashboardFrame::capture(dashboard))?);
        }
        OutputFormat::Text => {
            print!("\x1B[2J\x1B[H");
            println!("{}", render_frame(dashboard));
            if let Some(notice) = notice {
                println!("{}", notice.yellow());
            }
        }
    }
    Ok(())
}
