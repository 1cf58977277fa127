// bb-test-utils: Shared test utilities for the bulletin-board suite.
//
// Provides a newline-delimited JSON line client for driving servers in
// integration tests, plus small polling helpers for eventually-consistent
// assertions.

pub mod line_client;

pub use line_client::{ClientError, LineClient};

use std::future::Future;
use std::time::Duration;

/// A fresh random client identity.
pub fn fresh_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Poll `probe` every 25 ms until it returns true or `limit` elapses.
/// Returns whether the condition was met; callers assert on it.
pub async fn wait_until<F, Fut>(limit: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if probe().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
