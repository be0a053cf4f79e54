//! Tests for `telegram::run_telegram` startup checks.

use std::sync::Arc;

use humbler::store::CounterStore;
use humbler::telegram::run_telegram;

#[tokio::test]
async fn malformed_token_is_rejected_before_dispatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(
        CounterStore::open(&dir.path().join("deaths.db"), None)
            .await
            .expect("open store"),
    );

    for token in ["", "   ", "no-colon", ":secret", "12ab:secret", "12345:"] {
        let result = run_telegram(token, Arc::clone(&store)).await;
        assert!(result.is_err(), "token {token:?} should be rejected");
    }
}
