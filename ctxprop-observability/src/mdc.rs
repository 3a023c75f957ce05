//! Per-task logging scope (MDC).
//!
//! A task-local key/value map the logging backend can render alongside each
//! line. The inbound layer opens a scope per request and fills it with the
//! context's logging fields; the outbound logging filter adds transient call
//! keys and removes them again on exit. Only the framework's own keys are
//! ever touched at teardown.

use std::cell::RefCell;
use std::future::Future;

use indexmap::IndexMap;

tokio::task_local! {
    static LOG_SCOPE: RefCell<IndexMap<String, String>>;
}

/// Run `future` with a fresh, empty logging scope.
pub async fn scope<F>(future: F) -> F::Output
where
    F: Future,
{
    LOG_SCOPE.scope(RefCell::new(IndexMap::new()), future).await
}

/// Whether the current task has a logging scope.
pub fn is_active() -> bool {
    LOG_SCOPE.try_with(|_| ()).is_ok()
}

/// Set one key. No-op outside a scope.
pub fn insert(key: &str, value: &str) {
    let _ = LOG_SCOPE.try_with(|scope| {
        scope
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    });
}

/// Set many keys at once.
pub fn extend(entries: &IndexMap<String, String>) {
    let _ = LOG_SCOPE.try_with(|scope| {
        let mut map = scope.borrow_mut();
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
    });
}

/// Remove one key.
pub fn remove(key: &str) {
    let _ = LOG_SCOPE.try_with(|scope| {
        scope.borrow_mut().shift_remove(key);
    });
}

/// Remove exactly the given keys, leaving foreign entries alone.
pub fn remove_all(keys: &[String]) {
    let _ = LOG_SCOPE.try_with(|scope| {
        let mut map = scope.borrow_mut();
        for key in keys {
            map.shift_remove(key);
        }
    });
}

/// Current scope contents; empty outside a scope.
pub fn snapshot() -> IndexMap<String, String> {
    LOG_SCOPE
        .try_with(|scope| scope.borrow().clone())
        .unwrap_or_default()
}

/// One value from the scope.
pub fn get(key: &str) -> Option<String> {
    LOG_SCOPE
        .try_with(|scope| scope.borrow().get(key).cloned())
        .ok()
        .flatten()
}
