//! In-memory host fakes for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::channels::ChannelSpec;
use crate::continuity::{UiRuntime, UiRuntimeFactory};
use crate::error::CheckinFfiError;
use crate::notifications::{Notification, NotificationService};
use crate::scheduler::{TimerService, WakeRegistration};

#[derive(Default)]
pub struct FakeTimerService {
    pending: Mutex<HashMap<i32, WakeRegistration>>,
    fail: AtomicBool,
}

impl FakeTimerService {
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn pending(&self, alarm_id: i32) -> Option<WakeRegistration> {
        self.pending.lock().unwrap().get(&alarm_id).cloned()
    }
}

impl TimerService for FakeTimerService {
    fn set_exact_and_allow_while_idle(
        &self,
        registration: WakeRegistration,
    ) -> Result<(), CheckinFfiError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err("timer unavailable".into());
        }
        self.pending
            .lock()
            .unwrap()
            .insert(registration.alarm_id, registration);
        Ok(())
    }

    fn cancel(&self, alarm_id: i32) -> Result<(), CheckinFfiError> {
        self.pending.lock().unwrap().remove(&alarm_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotificationService {
    channels: Mutex<BTreeMap<String, ChannelSpec>>,
    create_calls: AtomicUsize,
    fail_channels: AtomicBool,
    posted: Mutex<HashMap<i32, Notification>>,
}

impl FakeNotificationService {
    pub fn fail_create_channel(&self, fail: bool) {
        self.fail_channels.store(fail, Ordering::SeqCst);
    }

    pub fn create_channel_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.lock().unwrap().keys().cloned().collect()
    }

    pub fn posted(&self, id: i32) -> Option<Notification> {
        self.posted.lock().unwrap().get(&id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }
}

impl NotificationService for FakeNotificationService {
    fn create_channel(&self, spec: ChannelSpec) -> Result<(), CheckinFfiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_channels.load(Ordering::SeqCst) {
            return Err("channels unsupported".into());
        }
        self.channels.lock().unwrap().insert(spec.id.clone(), spec);
        Ok(())
    }

    fn notify(&self, id: i32, notification: Notification) -> Result<(), CheckinFfiError> {
        self.posted.lock().unwrap().insert(id, notification);
        Ok(())
    }

    fn cancel(&self, id: i32) -> Result<(), CheckinFfiError> {
        self.posted.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUiRuntime {
    entrypoint_runs: AtomicUsize,
    destroy_calls: AtomicUsize,
    fail_entrypoint: AtomicBool,
    fail_invoke: AtomicBool,
    invocations: Mutex<Vec<(String, String)>>,
}

impl FakeUiRuntime {
    pub fn entrypoint_runs(&self) -> usize {
        self.entrypoint_runs.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn fail_invoke(&self, fail: bool) {
        self.fail_invoke.store(fail, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl UiRuntime for FakeUiRuntime {
    fn execute_default_entrypoint(&self) -> Result<(), CheckinFfiError> {
        self.entrypoint_runs.fetch_add(1, Ordering::SeqCst);
        if self.fail_entrypoint.load(Ordering::SeqCst) {
            return Err("entrypoint crashed".into());
        }
        Ok(())
    }

    fn invoke_method(&self, method: String, payload_json: String) -> Result<(), CheckinFfiError> {
        if self.fail_invoke.load(Ordering::SeqCst) {
            return Err("channel closed".into());
        }
        self.invocations.lock().unwrap().push((method, payload_json));
        Ok(())
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeRuntimeFactory {
    created: Mutex<Vec<Arc<FakeUiRuntime>>>,
    fail_entrypoint: AtomicBool,
}

impl FakeRuntimeFactory {
    pub fn fail_entrypoint(&self, fail: bool) {
        self.fail_entrypoint.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Arc<FakeUiRuntime>> {
        self.created.lock().unwrap().last().cloned()
    }
}

impl UiRuntimeFactory for FakeRuntimeFactory {
    fn create_runtime(&self) -> Arc<dyn UiRuntime> {
        let runtime = Arc::new(FakeUiRuntime::default());
        runtime
            .fail_entrypoint
            .store(self.fail_entrypoint.load(Ordering::SeqCst), Ordering::SeqCst);
        self.created.lock().unwrap().push(Arc::clone(&runtime));
        runtime
    }
}
