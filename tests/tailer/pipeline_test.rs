//! End-to-end behaviour of one tailer over a growing file.

use std::time::Duration;

use humbler::tailer::CycleOutcome;
use tokio::sync::watch;

use crate::support::{append, provider, Fixture, SLAIN};

#[tokio::test]
async fn slain_line_is_counted_and_announced() {
    let fx = Fixture::new(Some("6")).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice", "Bob"]));

    assert_eq!(tailer.poll_once().await, CycleOutcome::Rotated { epoch: 1 });

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 1
        }
    );

    let record = fx.store.counts_for("Alice").await.expect("counts");
    assert_eq!(record.total_count, 1);
    assert_eq!(record.period_count, 1);

    let events = fx.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Get humbled");
    assert_eq!(
        events[0].description,
        "Alice was slain by Zombie (Season 6 Deaths: 1, Total Deaths: 1)"
    );
}

#[tokio::test]
async fn content_present_at_startup_is_skipped() {
    let fx = Fixture::new(None).await;
    append(&fx.log, &format!("{SLAIN}\n"));
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));

    assert!(matches!(
        tailer.poll_once().await,
        CycleOutcome::Rotated { .. }
    ));
    assert_eq!(tailer.poll_once().await, CycleOutcome::Idle);
    assert!(fx.notifier.events().is_empty());
}

#[tokio::test]
async fn repeated_line_counts_once_per_epoch() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));
    tailer.poll_once().await;

    append(&fx.log, &format!("{SLAIN}\n{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 2,
            emitted: 1
        }
    );

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 0
        }
    );

    let record = fx.store.counts_for("Alice").await.expect("counts");
    assert_eq!(record.total_count, 1);
    assert_eq!(fx.notifier.events().len(), 1);
}

#[tokio::test]
async fn unknown_subject_and_disconnect_lines_are_ignored() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));
    tailer.poll_once().await;

    append(
        &fx.log,
        "[12:00:02] [Server thread/INFO]: Mallory was slain by Zombie\n\
         [12:00:03] [Server thread/INFO]: Alice lost connection: was slain by timeout\n\
         \n",
    );
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 3,
            emitted: 0
        }
    );
    assert!(fx.notifier.events().is_empty());
    assert!(fx.store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn empty_subject_list_matches_nothing() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &[]));
    tailer.poll_once().await;

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 0
        }
    );
    assert!(fx.notifier.events().is_empty());
}

#[tokio::test]
async fn partial_line_waits_for_its_newline() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));
    tailer.poll_once().await;

    append(&fx.log, "[12:00:01] [Server thread/INFO]: Alice was slain by Zom");
    assert_eq!(tailer.poll_once().await, CycleOutcome::Idle);
    assert_eq!(tailer.state().cursor.offset(), 0);

    append(&fx.log, "bie\n");
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 1
        }
    );
    let events = fx.notifier.events();
    assert_eq!(
        events[0].description,
        "Alice was slain by Zombie (Total Deaths: 1)"
    );
}

#[tokio::test]
async fn run_stops_when_shutdown_is_signalled() {
    let fx = Fixture::new(None).await;
    let tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(tailer.run(rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).expect("send shutdown");

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("tailer should stop promptly")
        .expect("join");
}
