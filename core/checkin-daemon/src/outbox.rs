//! Outbox-backed UI runtime.
//!
//! The desktop host has no embedded UI engine; its "runtime" records every
//! message sent across the boundary so clients can poll them. At most
//! `MAX_QUEUED_EVENTS` messages are held; older ones are dropped first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use checkin_core::{CheckinFfiError, UiRuntime, UiRuntimeFactory};
use checkin_protocol::OutboxMessage;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const MAX_QUEUED_EVENTS: usize = 256;

#[derive(Default)]
pub struct Outbox {
    messages: Mutex<VecDeque<OutboxMessage>>,
}

impl Outbox {
    fn lock(&self) -> MutexGuard<'_, VecDeque<OutboxMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: OutboxMessage) {
        let mut messages = self.lock();
        if messages.len() >= MAX_QUEUED_EVENTS {
            if let Some(dropped) = messages.pop_front() {
                warn!(
                    method = %dropped.method,
                    sent_at = %dropped.sent_at,
                    "Outbox full, dropping oldest message"
                );
            }
        }
        messages.push_back(message);
    }

    /// Returns and clears everything sent so far.
    pub fn drain(&self) -> Vec<OutboxMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

pub struct OutboxRuntime {
    id: u64,
    outbox: Arc<Outbox>,
    started: AtomicBool,
    destroyed: AtomicBool,
}

impl OutboxRuntime {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            outbox,
            started: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl UiRuntime for OutboxRuntime {
    fn execute_default_entrypoint(&self) -> Result<(), CheckinFfiError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(format!("runtime {} already started", self.id).into());
        }
        debug!(runtime_id = self.id, "Runtime entrypoint executed");
        Ok(())
    }

    fn invoke_method(&self, method: String, payload_json: String) -> Result<(), CheckinFfiError> {
        if self.is_destroyed() {
            return Err(format!("runtime {} is destroyed", self.id).into());
        }
        let payload: Value = serde_json::from_str(&payload_json).map_err(|err| {
            CheckinFfiError::InvalidArgument {
                message: format!("payload is not JSON: {}", err),
            }
        })?;
        info!(runtime_id = self.id, method = %method, "Message queued for UI");
        self.outbox.push(OutboxMessage {
            method,
            payload,
            sent_at: Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            info!(runtime_id = self.id, "Runtime destroyed");
        }
    }
}

pub struct OutboxRuntimeFactory {
    outbox: Arc<Outbox>,
}

impl OutboxRuntimeFactory {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }
}

impl UiRuntimeFactory for OutboxRuntimeFactory {
    fn create_runtime(&self) -> Arc<dyn UiRuntime> {
        Arc::new(OutboxRuntime::new(Arc::clone(&self.outbox)))
    }
}
