//! Tests for `telegram::commands` and slash command dispatch.

use humbler::store::CounterStore;
use humbler::telegram::{commands, dispatch_command};

async fn store(season: Option<&str>) -> (CounterStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CounterStore::open(&dir.path().join("deaths.db"), season.map(str::to_owned))
        .await
        .expect("open store");
    (store, dir)
}

#[test]
fn help_lists_every_command() {
    let help = commands::handle_help();
    assert!(help.contains("/deaths <player>"));
    assert!(help.contains("/scoreboard"));
    assert!(help.contains("/help"));
}

#[tokio::test]
async fn deaths_reports_season_count() {
    let (store, _dir) = store(Some("6")).await;
    store.increment("Alice").await.expect("inc");
    store.increment("Alice").await.expect("inc");

    let reply = commands::handle_deaths(&store, "alice").await;
    assert_eq!(reply, "alice has died 2 time(s) in Season 6");
}

#[tokio::test]
async fn deaths_without_season_reports_total() {
    let (store, _dir) = store(None).await;
    store.increment("Bob").await.expect("inc");

    let reply = commands::handle_deaths(&store, "Bob").await;
    assert_eq!(reply, "Bob has died 1 time(s)");
}

#[tokio::test]
async fn deaths_for_unknown_player_is_zero() {
    let (store, _dir) = store(Some("6")).await;
    let reply = commands::handle_deaths(&store, "Nobody").await;
    assert_eq!(reply, "Nobody has died 0 time(s) in Season 6");
}

#[tokio::test]
async fn deaths_without_name_shows_usage() {
    let (store, _dir) = store(None).await;
    let reply = commands::handle_deaths(&store, "  ").await;
    assert!(reply.starts_with("Usage:"));
}

#[tokio::test]
async fn empty_scoreboard_has_placeholder() {
    let (store, _dir) = store(None).await;
    assert_eq!(
        commands::handle_scoreboard(&store).await,
        commands::EMPTY_SCOREBOARD
    );
}

#[tokio::test]
async fn scoreboard_ranks_most_deaths_first() {
    let (store, _dir) = store(Some("6")).await;
    store.increment("Alice").await.expect("inc");
    for _ in 0..3 {
        store.increment("Bob").await.expect("inc");
    }

    let board = commands::handle_scoreboard(&store).await;
    let lines: Vec<_> = board.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Season 6 Humbler Scoreboard",
            "1. Bob: 3 deaths",
            "2. Alice: 1 death",
        ]
    );
}

#[tokio::test]
async fn dispatch_strips_bot_mention_and_parses_args() {
    let (store, _dir) = store(None).await;
    store.increment("Carol").await.expect("inc");

    let reply = dispatch_command("/deaths@humbler_bot Carol", &store).await;
    assert_eq!(reply.as_deref(), Some("Carol has died 1 time(s)"));

    let reply = dispatch_command("/scoreboard", &store).await.expect("reply");
    assert!(reply.contains("1. Carol: 1 death"));
}

#[tokio::test]
async fn dispatch_ignores_plain_text_and_flags_unknown_commands() {
    let (store, _dir) = store(None).await;
    assert!(dispatch_command("hello there", &store).await.is_none());
    assert_eq!(
        dispatch_command("/dance", &store).await.as_deref(),
        Some("Unknown command: /dance")
    );
}
