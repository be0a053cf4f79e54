//! Tests for `src/logging.rs`.

use humbler::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir_and_rejects_second_init() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    let first = humbler::logging::init_production(&logs_dir);
    assert!(first.is_ok());
    assert!(logs_dir.exists(), "logs directory should be created");

    let second = humbler::logging::init_production(&logs_dir);
    assert!(second.is_err(), "only one global subscriber may be installed");

    // Stderr-only init after the fact is a silent no-op.
    humbler::logging::init_cli();
}
