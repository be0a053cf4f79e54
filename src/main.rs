//! Humbler CLI entry point.
//!
//! Provides `start` to run the tailer (and the Telegram command bot when a
//! token is configured), `deaths` and `scoreboard` to query the counter
//! store, and `check` to classify a single line against the live sources.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use humbler::config::{config_dir, load_config, resolve_config_path, HumblerConfig};
use humbler::matcher::Matcher;
use humbler::notifier::{FanoutNotifier, LogNotifier, Notifier, TelegramNotifier, WebhookNotifier};
use humbler::patterns;
use humbler::provider::JsonFileProvider;
use humbler::store::CounterStore;
use humbler::tailer::{Tailer, TailerDeps};
use humbler::telegram::{self, commands};
use humbler::transform::transform_line;

/// Humbler: counts player deaths in a game server log.
#[derive(Parser)]
#[command(name = "humbler", version, about)]
struct Cli {
    /// Path to `humbler.toml` (default: `./humbler.toml`, then `~/.humbler/humbler.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Tail the log and announce deaths until Ctrl+C.
    Start,
    /// Print the death count for one player.
    Deaths {
        /// Player name (case-insensitive).
        name: String,
    },
    /// Print the scoreboard, most deaths first.
    Scoreboard,
    /// Classify a single log line against the configured sources.
    Check {
        /// Raw log line, including any timestamp prefix.
        line: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let config_path = resolve_config_path(cli.config);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load {}", path.display()),
        None => "failed to load configuration".to_owned(),
    })?;

    match cli.command {
        Command::Start => handle_start(config).await,
        Command::Deaths { name } => handle_deaths(&config, &name).await,
        Command::Scoreboard => handle_scoreboard(&config).await,
        Command::Check { line } => handle_check(&config, &line).await,
    }
}

async fn open_store(config: &HumblerConfig) -> anyhow::Result<CounterStore> {
    CounterStore::open(&config.store.path, config.season.label.clone())
        .await
        .context("failed to open counter store")
}

fn secret_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Pick the notification sinks from the environment and config.
fn build_notifier(config: &HumblerConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    let mut sinks: Vec<Arc<dyn Notifier>> = Vec::new();

    if let Some(url) = secret_from_env(&config.notify.webhook_url_env) {
        sinks.push(Arc::new(WebhookNotifier::new(url, config.notify.timeout())?));
        info!("webhook notifications enabled");
    }

    if !config.notify.telegram_chats.is_empty() {
        match secret_from_env(&config.notify.telegram_token_env) {
            Some(token) => {
                sinks.push(Arc::new(TelegramNotifier::new(
                    &token,
                    config.notify.telegram_chats.clone(),
                )));
                info!(
                    chats = config.notify.telegram_chats.len(),
                    "telegram notifications enabled"
                );
            }
            None => warn!(
                var = %config.notify.telegram_token_env,
                "telegram chats configured but no bot token set"
            ),
        }
    }

    Ok(match sinks.len() {
        0 => {
            info!("no notification sink configured, logging events only");
            Arc::new(LogNotifier)
        }
        1 => sinks.remove(0),
        _ => Arc::new(FanoutNotifier::new(sinks)),
    })
}

/// Run the tailer daemon.
async fn handle_start(config: HumblerConfig) -> anyhow::Result<()> {
    let logs_dir = config_dir()?.join("logs");
    let _logging_guard = humbler::logging::init_production(&logs_dir)?;

    let log_path = config.log_path()?.to_path_buf();

    // Store failure at startup is fatal.
    let store = Arc::new(open_store(&config).await?);
    let notifier = build_notifier(&config)?;
    let provider = Arc::new(JsonFileProvider::new(config.sources.to_source_paths()));

    let deps = TailerDeps {
        provider,
        store: Arc::clone(&store),
        notifier,
        matcher: Matcher::new(
            &config.matching.disconnect_marker,
            config.matching.require_subject_prefix,
        ),
        style: config.notify.style(),
        notify_timeout: config.notify.timeout(),
    };

    info!(
        log = %log_path.display(),
        store = %config.store.path.display(),
        season = config.season.label.as_deref().unwrap_or("-"),
        "humbler started"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tailer = tokio::spawn(Tailer::new(log_path, deps).run(shutdown_rx));

    let bot = secret_from_env(&config.notify.telegram_token_env).map(|token| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            if let Err(e) = telegram::run_telegram(&token, store).await {
                warn!(error = %e, "telegram command bot stopped");
            }
        })
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    if let Err(e) = tailer.await {
        warn!(error = %e, "tailer task ended abnormally");
    }
    if let Some(bot) = bot {
        bot.abort();
    }

    info!("humbler stopped");
    Ok(())
}

/// Print one player's count.
async fn handle_deaths(config: &HumblerConfig, name: &str) -> anyhow::Result<()> {
    humbler::logging::init_cli();
    let store = open_store(config).await?;
    println!("{}", commands::handle_deaths(&store, name).await);
    Ok(())
}

/// Print the scoreboard.
async fn handle_scoreboard(config: &HumblerConfig) -> anyhow::Result<()> {
    humbler::logging::init_cli();
    let store = open_store(config).await?;
    println!("{}", commands::handle_scoreboard(&store).await);
    Ok(())
}

/// Classify one line and report how it would be handled.
async fn handle_check(config: &HumblerConfig, line: &str) -> anyhow::Result<()> {
    humbler::logging::init_cli();

    let provider = JsonFileProvider::new(config.sources.to_source_paths());
    let snapshot = patterns::load_snapshot(&provider, &[])
        .await
        .context("failed to load pattern sources")?;

    info!(
        events = snapshot.event_count(),
        subjects = snapshot.subject_count(),
        debug_subjects = snapshot.debug_subject_count(),
        "sources loaded"
    );

    let matcher = Matcher::new(
        &config.matching.disconnect_marker,
        config.matching.require_subject_prefix,
    );
    let result = matcher.matches(line, &snapshot);

    println!("match:       {}", result.is_match);
    println!("transformed: {}", transform_line(line).trim());
    println!(
        "subject:     {}",
        result.subject_name.as_deref().unwrap_or("-")
    );
    if matcher.is_excluded(line) {
        println!("excluded:    disconnect marker present");
    }
    Ok(())
}
