//! Telegram command bot: a read-only client of the counter store.
//!
//! Answers `/deaths`, `/scoreboard`, and `/help` in any chat the bot is
//! added to. It never writes to the store.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::store::CounterStore;

pub mod commands;
pub mod ui;

/// Shared dependencies injected into teloxide handlers via `dptree::deps!`.
#[derive(Clone)]
struct SharedState {
    store: Arc<CounterStore>,
}

/// Run the command bot until Ctrl+C.
///
/// # Errors
///
/// Returns an error if `bot_token` is not of the `<bot id>:<secret>` form.
pub async fn run_telegram(bot_token: &str, store: Arc<CounterStore>) -> anyhow::Result<()> {
    anyhow::ensure!(
        is_plausible_token(bot_token),
        "telegram bot token must look like <bot id>:<secret>"
    );
    let bot = Bot::new(bot_token.trim());
    let shared = SharedState { store };

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    info!("telegram command bot starting");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![shared])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn is_plausible_token(token: &str) -> bool {
    token.trim().split_once(':').is_some_and(|(id, secret)| {
        !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && !secret.is_empty()
    })
}

async fn handle_message(bot: Bot, msg: Message, state: SharedState) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(reply) = dispatch_command(text, &state.store).await else {
        return Ok(());
    };

    debug!(chat = msg.chat.id.0, "answering command");
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Parse and dispatch a slash command. Non-commands yield `None`.
pub async fn dispatch_command(text: &str, store: &CounterStore) -> Option<String> {
    let without_slash = text.trim().strip_prefix('/')?;
    let (full_command, args) = match without_slash.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (without_slash, ""),
    };
    // Strip @bot_name suffix if present
    let command = full_command.split('@').next().unwrap_or(full_command);

    let reply = match command {
        "help" | "start" => commands::handle_help(),
        "deaths" => commands::handle_deaths(store, args).await,
        "scoreboard" => commands::handle_scoreboard(store).await,
        _ => format!("Unknown command: /{command}"),
    };
    Some(reply)
}
