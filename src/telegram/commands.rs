//! Read-only chat commands over the counter store.
//!
//! Each function returns plain text, shared by the Telegram bot and the CLI.

use crate::store::CounterStore;
use crate::telegram::ui::plural;

/// Reply when nobody has been counted yet.
pub const EMPTY_SCOREBOARD: &str = "The scoreboard is empty! No one has been humbled yet";

/// List all available commands.
pub fn handle_help() -> String {
    [
        "Available commands:",
        "",
        "/deaths <player> - death count for a player",
        "/scoreboard - everyone, most humbled first",
        "/help - show this message",
    ]
    .join("\n")
}

/// Death count for one player. Unknown players report zero.
pub async fn handle_deaths(store: &CounterStore, player: &str) -> String {
    let player = player.trim();
    if player.is_empty() {
        return "Usage: /deaths <player>".to_owned();
    }

    match store.counts_for(player).await {
        Ok(record) => match store.season() {
            Some(season) => format!(
                "{player} has died {} time(s) in Season {season}",
                record.period_count
            ),
            None => format!("{player} has died {} time(s)", record.total_count),
        },
        Err(e) => format!("Could not look up {player}: {e}"),
    }
}

/// Ranked scoreboard, most deaths first.
pub async fn handle_scoreboard(store: &CounterStore) -> String {
    let board = match store.list_all().await {
        Ok(board) => board,
        Err(e) => return format!("Could not load the scoreboard: {e}"),
    };

    if board.is_empty() {
        return EMPTY_SCOREBOARD.to_owned();
    }

    let mut lines = vec![match store.season() {
        Some(season) => format!("Season {season} Humbler Scoreboard"),
        None => "Humbler Scoreboard".to_owned(),
    }];

    let seasonal = store.season().is_some();
    for (rank, record) in (1u64..).zip(&board) {
        let count = if seasonal {
            record.period_count
        } else {
            record.total_count
        };
        lines.push(format!(
            "{rank}. {name}: {deaths}",
            name = record.subject,
            deaths = plural(count, "death")
        ));
    }
    lines.join("\n")
}
