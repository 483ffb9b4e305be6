//! Thread-backed timer service.
//!
//! One worker thread sleeps on a condvar until the earliest registration is
//! due, then hands every due wake to the sink outside the lock. Registering an
//! id again replaces its pending wake; past triggers fire immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use checkin_core::{CheckinFfiError, TimerService, WakeRegistration};
use chrono::Utc;
use tracing::{debug, info};

struct TimerInner {
    pending: Mutex<HashMap<i32, WakeRegistration>>,
    changed: Condvar,
    shutdown: AtomicBool,
}

impl TimerInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<i32, WakeRegistration>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Clone)]
pub struct ThreadTimerService {
    inner: Arc<TimerInner>,
}

impl Default for ThreadTimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTimerService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TimerInner {
                pending: Mutex::new(HashMap::new()),
                changed: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Starts the worker. `sink` runs on the worker thread for each due wake.
    pub fn start<F>(&self, sink: F) -> JoinHandle<()>
    where
        F: Fn(WakeRegistration) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || run_worker(inner, sink))
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.changed.notify_all();
    }

    pub fn pending(&self) -> Vec<WakeRegistration> {
        let mut pending: Vec<_> = self.inner.lock().values().cloned().collect();
        pending.sort_by_key(|r| (r.trigger_at_millis, r.alarm_id));
        pending
    }
}

impl TimerService for ThreadTimerService {
    fn set_exact_and_allow_while_idle(
        &self,
        registration: WakeRegistration,
    ) -> Result<(), CheckinFfiError> {
        debug!(
            alarm_id = registration.alarm_id,
            trigger_at_millis = registration.trigger_at_millis,
            "Wake registered"
        );
        self.inner
            .lock()
            .insert(registration.alarm_id, registration);
        self.inner.changed.notify_all();
        Ok(())
    }

    fn cancel(&self, alarm_id: i32) -> Result<(), CheckinFfiError> {
        if self.inner.lock().remove(&alarm_id).is_some() {
            debug!(alarm_id, "Pending wake removed");
            self.inner.changed.notify_all();
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn run_worker<F>(inner: Arc<TimerInner>, sink: F)
where
    F: Fn(WakeRegistration),
{
    loop {
        let due = {
            let mut pending = inner.lock();
            loop {
                if inner.shutdown.load(Ordering::SeqCst) {
                    debug!("Timer worker stopped");
                    return;
                }
                let now = now_millis();
                match pending.values().map(|r| r.trigger_at_millis).min() {
                    None => {
                        pending = inner
                            .changed
                            .wait(pending)
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                    }
                    Some(next) if next <= now => break,
                    Some(next) => {
                        let wait = Duration::from_millis(next.saturating_sub(now) as u64);
                        pending = inner
                            .changed
                            .wait_timeout(pending, wait)
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .0;
                    }
                }
            }

            let now = now_millis();
            let ids: Vec<i32> = pending
                .values()
                .filter(|r| r.trigger_at_millis <= now)
                .map(|r| r.alarm_id)
                .collect();
            ids.iter()
                .filter_map(|id| pending.remove(id))
                .collect::<Vec<_>>()
        };

        for wake in due {
            info!(alarm_id = wake.alarm_id, "Wake fired");
            sink(wake);
        }
    }
}
