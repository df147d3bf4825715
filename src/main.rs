//! # casefeed
//!
//! Command-line event feed: connects to the case/workflow event socket,
//! subscribes the configured topics, and prints notifications, alerts and
//! connection state changes until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use casefeed_client::{ClientConfig, EventClient};
use casefeed_core::{AuthToken, Topic};
use casefeed_notify::{ChannelAlertSink, NotificationCenter};
use casefeed_router::EventRouter;
use casefeed_settings::{load_settings, load_settings_from_path};
use casefeed_telemetry::{init_telemetry, LogQuery, TelemetryConfig};

/// Resilient case/workflow event feed.
#[derive(Parser, Debug)]
#[command(name = "casefeed", about = "Follow the case and workflow event feed")]
struct Cli {
    /// Socket URL (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Bearer token appended to the socket URL.
    #[arg(long, env = "CASEFEED_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Extra topic to subscribe. Repeatable.
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Settings file (defaults to `~/.casefeed/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("Failed to load settings")?;
    if let Some(url) = cli.url {
        settings.client.url = url;
        casefeed_settings::loader::validate(&settings).context("Invalid --url")?;
    }

    let telemetry = init_telemetry(TelemetryConfig::from(&settings.logging));
    tracing::info!(url = %settings.client.url, "starting casefeed");

    let client = EventClient::websocket(ClientConfig::from(&settings.client));
    let router = EventRouter::default();
    let _attached = router.attach(&client);

    let (sink, mut alerts) = ChannelAlertSink::channel();
    let center = NotificationCenter::new(
        client.clone(),
        &router,
        Arc::new(sink),
        &settings.notifications,
    );

    for topic in cli.topics {
        client.subscribe(Topic::from(topic));
    }
    center.start_session(AuthToken::from(cli.token.unwrap_or_default()));

    let mut states = client.state_changes();
    let mut records = center.records();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(alert) = alerts.recv() => {
                println!("[{}] {}: {}", alert.severity, alert.title, alert.body);
            }
            record = records.recv() => match record {
                Ok(record) => {
                    let link = record.link.as_deref().unwrap_or("");
                    println!("{} {:<7} {} | {} {link}", record.timestamp, record.severity.as_str(), record.title, record.body);
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "notification output lagged"),
                Err(RecvError::Closed) => break,
            },
            state = states.recv() => match state {
                Ok(state) => println!("-- {state}"),
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "state changes lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("shutting down");
    center.end_session();
    client.shutdown().await.context("Client task already stopped")?;

    println!(
        "{} notifications, {} unread",
        center.len(),
        center.unread_count()
    );
    if let Some(logs) = telemetry.logs() {
        let recent = logs.query(&LogQuery {
            limit: Some(5),
            ..LogQuery::default()
        });
        for record in recent.iter().rev() {
            println!("  {} {} {}", record.timestamp, record.level, record.message);
        }
    }
    Ok(())
}
