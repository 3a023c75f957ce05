//! The per-request context store and its request-scoped handle.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tracing::debug;

use crate::index::FieldIndex;
use crate::mask;

/// Keyed store of extracted field values, owned by one request.
///
/// Two insertion-ordered maps run in parallel: `values` holds raw values,
/// `masked` holds the rendered masks of sensitive fields. Reads through
/// [`get_masked_or_original`](ContextStore::get_masked_or_original) prefer
/// the mask; callers authorized to see raw values (controllers, downstream
/// propagation) use [`get`](ContextStore::get).
///
/// All mutation is serialized under a single lock, so parallel outbound
/// calls from the same request can read and capture concurrently.
#[derive(Default, Debug)]
pub struct ContextStore {
    inner: Mutex<Maps>,
}

#[derive(Default, Debug)]
struct Maps {
    values: IndexMap<String, String>,
    masked: IndexMap<String, String>,
}

impl ContextStore {
    pub fn new() -> Self {
        ContextStore::default()
    }

    /// Store a raw value, dropping any stale mask for the name.
    pub fn put(&self, name: &str, value: impl Into<String>) {
        let mut maps = self.lock();
        maps.values.insert(name.to_string(), value.into());
        maps.masked.shift_remove(name);
    }

    /// Store a raw value together with its rendered mask.
    pub fn put_with_mask(&self, name: &str, value: impl Into<String>, masked: impl Into<String>) {
        let mut maps = self.lock();
        maps.values.insert(name.to_string(), value.into());
        maps.masked.insert(name.to_string(), masked.into());
    }

    /// Store only a mask rendering for an already-present value.
    pub fn put_masked(&self, name: &str, masked: impl Into<String>) {
        self.lock().masked.insert(name.to_string(), masked.into());
    }

    /// Raw value.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().values.get(name).cloned()
    }

    /// Masked rendering when one exists, the raw value otherwise.
    pub fn get_masked_or_original(&self, name: &str) -> Option<String> {
        let maps = self.lock();
        maps.masked
            .get(name)
            .or_else(|| maps.values.get(name))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().values.contains_key(name)
    }

    pub fn remove(&self, name: &str) {
        let mut maps = self.lock();
        maps.values.shift_remove(name);
        maps.masked.shift_remove(name);
    }

    pub fn size(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&self) {
        let mut maps = self.lock();
        maps.values.clear();
        maps.masked.clear();
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().values.keys().cloned().collect()
    }

    /// Shallow copy of the raw values.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.lock().values.clone()
    }

    /// Shallow copy with masks substituted where present. This is the view
    /// observability projections consume.
    pub fn snapshot_masked(&self) -> IndexMap<String, String> {
        let maps = self.lock();
        maps.values
            .iter()
            .map(|(name, value)| {
                let shown = maps.masked.get(name).unwrap_or(value);
                (name.clone(), shown.clone())
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Maps> {
        // A poisoned lock would mean a panic mid-insert; the maps are still
        // structurally sound, so keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lifecycle of a request as it moves through the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    PreAuthExtracted,
    PostAuthExtracted,
    BodyExtracted,
    ResponseEnriched,
    TornDown,
}

/// Handle to one request's context: the store, the pipeline state and the
/// process-wide field index it was built against.
///
/// Cloned handles (`Arc<RequestContext>`) may be read from any task working
/// on the request's behalf; see the `scope` module for ambient access.
#[derive(Debug)]
pub struct RequestContext {
    store: ContextStore,
    state: Mutex<PipelineState>,
    index: Arc<FieldIndex>,
}

impl RequestContext {
    pub fn new(index: Arc<FieldIndex>) -> Self {
        RequestContext {
            store: ContextStore::new(),
            state: Mutex::new(PipelineState::Init),
            index,
        }
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn index(&self) -> &Arc<FieldIndex> {
        &self.index
    }

    /// Raw value of a field. Emits an audit event when the field is
    /// configured with `audit-on-access`.
    pub fn get(&self, name: &str) -> Option<String> {
        if self.index.audit_on_access(name) {
            debug!(field = name, "raw context value accessed");
        }
        self.store.get(name)
    }

    /// Masked-if-sensitive view of a field.
    pub fn get_display(&self, name: &str) -> Option<String> {
        self.store.get_masked_or_original(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    /// Write a field programmatically. The masked rendering of a sensitive
    /// field is recomputed on every write.
    pub fn set_field(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.index.mask_pattern(name) {
            Some(pattern) => {
                let masked = mask::render(pattern, &value);
                self.store.put_with_mask(name, value, masked);
            }
            None => self.store.put(name, value),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_state(&self, next: PipelineState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }
}
