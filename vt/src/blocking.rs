//! Store calls from async code
//!
//! `Store` methods hold a mutex and hit SQLite synchronously. Async callers go
//! through [`run_blocking`] so that work lands on tokio's blocking pool rather
//! than a runtime worker thread.

use taskstore::{Store, StoreError, StoreResult};
use tracing::debug;

/// Run one store operation on the blocking pool against a clone of `store`
pub async fn run_blocking<T, F>(store: &Store, op: F) -> StoreResult<T>
where
    F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| {
            debug!(error = %e, "run_blocking: store task did not complete");
            StoreError::Worker(e.to_string())
        })?
}
