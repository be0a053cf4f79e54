//! Rotation, truncation, and missing-file handling.

use humbler::tailer::{CycleOutcome, NOT_FOUND_BACKOFF, ROTATION_SETTLE};

use crate::support::{append, provider, Fixture, SLAIN};

#[tokio::test]
async fn truncation_starts_new_epoch_and_allows_re_emission() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));
    tailer.poll_once().await;

    append(&fx.log, &format!("{SLAIN}\n"));
    tailer.poll_once().await;

    std::fs::OpenOptions::new()
        .write(true)
        .open(&fx.log)
        .expect("open")
        .set_len(0)
        .expect("truncate");

    let outcome = tailer.poll_once().await;
    assert_eq!(outcome, CycleOutcome::Rotated { epoch: 2 });
    assert_eq!(outcome.backoff(), ROTATION_SETTLE);
    assert_eq!(tailer.state().cursor.offset(), 0);
    assert!(tailer.state().dedup.is_empty());

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 1
        }
    );

    let record = fx.store.counts_for("Alice").await.expect("counts");
    assert_eq!(record.total_count, 2);
    assert_eq!(fx.notifier.events().len(), 2);
}

#[tokio::test]
async fn renamed_file_is_followed_by_identity() {
    let fx = Fixture::new(None).await;
    fx.create_log();
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));
    tailer.poll_once().await;

    append(&fx.log, &format!("{SLAIN}\n"));
    tailer.poll_once().await;

    std::fs::rename(&fx.log, fx.dir.path().join("latest.log.1")).expect("rename");
    fx.create_log();

    assert_eq!(tailer.poll_once().await, CycleOutcome::Rotated { epoch: 2 });

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 1
        }
    );
}

#[tokio::test]
async fn missing_file_backs_off_then_recovers() {
    let fx = Fixture::new(None).await;
    let mut tailer = fx.tailer(provider(&["was slain by"], &["Alice"]));

    let outcome = tailer.poll_once().await;
    assert_eq!(outcome, CycleOutcome::NotFound);
    assert_eq!(outcome.backoff(), NOT_FOUND_BACKOFF);

    fx.create_log();
    assert_eq!(tailer.poll_once().await, CycleOutcome::Rotated { epoch: 1 });

    append(&fx.log, &format!("{SLAIN}\n"));
    assert_eq!(
        tailer.poll_once().await,
        CycleOutcome::Processed {
            lines: 1,
            emitted: 1
        }
    );

    std::fs::remove_file(&fx.log).expect("remove");
    assert_eq!(tailer.poll_once().await, CycleOutcome::NotFound);
    assert_eq!(tailer.state().cursor.offset(), 0);
    assert!(tailer.state().dedup.is_empty());
}
