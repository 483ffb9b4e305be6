//! Engine continuity: reuse a live UI runtime or cold-start a new one.
//!
//! The prompt can be opened while the main application is running (its
//! runtime is in the cache and must be borrowed) or after the process was
//! killed (nothing cached, so the prompt creates a runtime and owns it).
//!
//! ```text
//! activate ──► cache hit?  ── yes ──► Reused     (teardown: nothing)
//!                          └─ no  ──► ColdStart  (teardown: destroy + evict)
//! ```
//!
//! Ownership is carried by [`RuntimeLease`]: only an owned lease destroys its
//! runtime, and it does so exactly once, on `release()` or on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CheckinError, CheckinFfiError, Result};

/// Embedded UI runtime hosting the application's non-native logic.
#[uniffi::export(with_foreign)]
pub trait UiRuntime: Send + Sync {
    fn execute_default_entrypoint(&self) -> std::result::Result<(), CheckinFfiError>;

    /// Sends one message across the boundary into the runtime.
    fn invoke_method(
        &self,
        method: String,
        payload_json: String,
    ) -> std::result::Result<(), CheckinFfiError>;

    fn destroy(&self);
}

#[uniffi::export(with_foreign)]
pub trait UiRuntimeFactory: Send + Sync {
    fn create_runtime(&self) -> Arc<dyn UiRuntime>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum ContinuityState {
    ColdStart,
    Reused,
}

static GLOBAL_CACHE: Lazy<Arc<RuntimeCache>> = Lazy::new(|| Arc::new(RuntimeCache::new()));

/// Process-wide runtime handles keyed by engine id.
pub struct RuntimeCache {
    entries: Mutex<HashMap<String, Arc<dyn UiRuntime>>>,
}

impl Default for RuntimeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The cache shared by everything in this process.
    pub fn global() -> Arc<RuntimeCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn UiRuntime>>> {
        // A poisoned map is still a valid map; keep serving it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, engine_id: &str) -> Option<Arc<dyn UiRuntime>> {
        self.lock().get(engine_id).cloned()
    }

    pub fn contains(&self, engine_id: &str) -> bool {
        self.lock().contains_key(engine_id)
    }

    /// Caches a runtime created by its owner (the main entry point).
    pub fn put(&self, engine_id: &str, runtime: Arc<dyn UiRuntime>) {
        self.lock().insert(engine_id.to_string(), runtime);
        debug!(engine_id, "Runtime cached");
    }

    pub fn remove(&self, engine_id: &str) -> Option<Arc<dyn UiRuntime>> {
        self.lock().remove(engine_id)
    }

    /// Looks up `engine_id` and, if absent, creates, starts and caches a new
    /// runtime, all under one lock so concurrent activations agree on who
    /// owns it. The factory must not call back into this cache.
    pub fn acquire_or_create(
        self: &Arc<Self>,
        engine_id: &str,
        factory: &dyn UiRuntimeFactory,
    ) -> Result<RuntimeLease> {
        let mut entries = self.lock();

        if let Some(existing) = entries.get(engine_id) {
            info!(engine_id, "Reusing live UI runtime");
            return Ok(RuntimeLease {
                cache: Arc::clone(self),
                engine_id: engine_id.to_string(),
                runtime: Arc::clone(existing),
                state: ContinuityState::Reused,
                released: false,
            });
        }

        let runtime = factory.create_runtime();
        if let Err(err) = runtime.execute_default_entrypoint() {
            runtime.destroy();
            return Err(CheckinError::host("execute_default_entrypoint", err));
        }
        entries.insert(engine_id.to_string(), Arc::clone(&runtime));
        info!(engine_id, "Cold-started UI runtime");

        Ok(RuntimeLease {
            cache: Arc::clone(self),
            engine_id: engine_id.to_string(),
            runtime,
            state: ContinuityState::ColdStart,
            released: false,
        })
    }

    fn evict_if_same(&self, engine_id: &str, runtime: &Arc<dyn UiRuntime>) -> bool {
        let mut entries = self.lock();
        let matches = entries
            .get(engine_id)
            .is_some_and(|cached| same_runtime(cached, runtime));
        if matches {
            entries.remove(engine_id);
        }
        matches
    }
}

fn same_runtime(a: &Arc<dyn UiRuntime>, b: &Arc<dyn UiRuntime>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// A runtime handle tagged with who owns it.
pub struct RuntimeLease {
    cache: Arc<RuntimeCache>,
    engine_id: String,
    runtime: Arc<dyn UiRuntime>,
    state: ContinuityState,
    released: bool,
}

impl RuntimeLease {
    pub fn runtime(&self) -> &Arc<dyn UiRuntime> {
        &self.runtime
    }

    pub fn state(&self) -> ContinuityState {
        self.state
    }

    pub fn is_owned(&self) -> bool {
        self.state == ContinuityState::ColdStart
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    /// Ends the lease. Owned runtimes are evicted and destroyed; borrowed
    /// ones are left to their creator.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if !self.is_owned() {
            debug!(engine_id = %self.engine_id, "Borrowed runtime left running");
            return;
        }

        // Someone may have replaced the cache entry since; only evict our own.
        let evicted = self.cache.evict_if_same(&self.engine_id, &self.runtime);
        self.runtime.destroy();
        info!(engine_id = %self.engine_id, evicted, "Owned UI runtime destroyed");
    }
}

impl Drop for RuntimeLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}
