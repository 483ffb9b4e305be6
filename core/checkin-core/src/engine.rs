//! CheckinEngine - the entry point foreign hosts hold on to.
//!
//! Wires the host collaborators (timer, notification center, UI runtime
//! factory) into the scheduler, receiver, dispatcher and continuity manager.
//! It's designed to be:
//! - **Synchronous**: every call returns before the host callback budget ends
//! - **Host-agnostic**: mobile shells, the desktop daemon and tests all plug in
//!   through the same traits
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use checkin_core::CheckinEngine;
//!
//! let engine = CheckinEngine::new(timer, notifications, factory);
//! engine.schedule_alarm(trigger_at_millis, "Silent".to_string());
//! // ... later, from the host's wake callback:
//! engine.on_wake(payload);
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::bridge::AlarmBridge;
use crate::config::{load_config, CheckinConfig};
use crate::continuity::{RuntimeCache, UiRuntime, UiRuntimeFactory};
use crate::error::{CheckinError, CheckinFfiError};
use crate::notifications::{NotificationDispatcher, NotificationService};
use crate::prompt::PromptSession;
use crate::receiver::WakeReceiver;
use crate::scheduler::{AlarmScheduler, TimerService};
use crate::types::{AlarmRecord, BehaviorTag};

#[derive(uniffi::Object)]
pub struct CheckinEngine {
    config: CheckinConfig,
    scheduler: Arc<AlarmScheduler>,
    dispatcher: Arc<NotificationDispatcher>,
    receiver: WakeReceiver,
    bridge: AlarmBridge,
    cache: Arc<RuntimeCache>,
    runtime_factory: Arc<dyn UiRuntimeFactory>,
}

impl CheckinEngine {
    /// Builds an engine around an explicit runtime cache.
    ///
    /// Used by tests and by hosts that keep several engines apart.
    /// Not exposed to FFI - foreign hosts share the process-wide cache.
    pub fn with_parts(
        config: CheckinConfig,
        timer: Arc<dyn TimerService>,
        notifications: Arc<dyn NotificationService>,
        runtime_factory: Arc<dyn UiRuntimeFactory>,
        cache: Arc<RuntimeCache>,
    ) -> Self {
        let scheduler = Arc::new(AlarmScheduler::new(timer));
        let dispatcher = Arc::new(NotificationDispatcher::new(notifications));
        let receiver = WakeReceiver::new(Arc::clone(&dispatcher), config.alarm_message.clone());
        let bridge = AlarmBridge::new(Arc::clone(&scheduler), config.clone());

        Self {
            config,
            scheduler,
            dispatcher,
            receiver,
            bridge,
            cache,
            runtime_factory,
        }
    }

    pub fn bridge(&self) -> &AlarmBridge {
        &self.bridge
    }

    pub fn runtime_cache(&self) -> &Arc<RuntimeCache> {
        &self.cache
    }

    /// Activates a prompt session for `alarm`, borrowing the live runtime or
    /// cold-starting one.
    pub fn start_prompt(&self, alarm: AlarmRecord) -> crate::Result<Arc<PromptSession>> {
        PromptSession::activate(
            alarm,
            &self.cache,
            &self.config.engine_id,
            self.runtime_factory.as_ref(),
            Arc::clone(&self.dispatcher),
        )
    }
}

#[uniffi::export]
impl CheckinEngine {
    /// Creates an engine from `~/.checkin/config.toml` (or `$CHECKIN_CONFIG`).
    ///
    /// A malformed config file is logged and replaced by defaults.
    #[uniffi::constructor]
    pub fn new(
        timer: Arc<dyn TimerService>,
        notifications: Arc<dyn NotificationService>,
        runtime_factory: Arc<dyn UiRuntimeFactory>,
    ) -> Self {
        let config = load_config().unwrap_or_else(|err| {
            warn!(error = %err, "Using default check-in configuration");
            CheckinConfig::default()
        });
        Self::with_config(config, timer, notifications, runtime_factory)
    }

    #[uniffi::constructor]
    pub fn with_config(
        config: CheckinConfig,
        timer: Arc<dyn TimerService>,
        notifications: Arc<dyn NotificationService>,
        runtime_factory: Arc<dyn UiRuntimeFactory>,
    ) -> Self {
        Self::with_parts(
            config,
            timer,
            notifications,
            runtime_factory,
            RuntimeCache::global(),
        )
    }

    pub fn config(&self) -> CheckinConfig {
        self.config.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Scheduling API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Declares the notification channels. Safe to call on every app start.
    pub fn register_channels(&self) -> Result<(), CheckinFfiError> {
        self.dispatcher
            .register_channels()
            .map_err(CheckinFfiError::from)
    }

    /// Schedules the configured alarm. Unknown behaviors use the default.
    pub fn schedule_alarm(&self, trigger_at_millis: i64, behavior: String) {
        self.scheduler.schedule(
            &self.config.alarm_record(),
            trigger_at_millis,
            BehaviorTag::from_wire(&behavior),
        );
    }

    pub fn cancel_alarm(&self) {
        self.scheduler.cancel(&self.config.alarm_record());
    }

    /// Method-channel entry point: `method` by name, `args_json` as a JSON
    /// object (or absent). Returns the JSON-encoded result.
    pub fn handle_method_call(
        &self,
        method: String,
        args_json: Option<String>,
    ) -> Result<String, CheckinFfiError> {
        let params = match args_json.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(serde_json::from_str::<Value>(raw).map_err(|err| {
                CheckinError::invalid_argument(format!("{} arguments are not JSON: {}", method, err))
            })?),
        };

        let result = self.bridge.call(&method, params)?;
        serde_json::to_string(&result)
            .map_err(|source| CheckinError::Codec {
                context: format!("{} result", method),
                source,
            })
            .map_err(CheckinFfiError::from)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Delivery API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Host wake callback. Never fails; problems are logged.
    pub fn on_wake(&self, payload: String) {
        self.receiver.on_receive(&payload);
    }

    pub fn show_notification(
        &self,
        record: AlarmRecord,
        behavior: BehaviorTag,
    ) -> Result<(), CheckinFfiError> {
        self.dispatcher
            .show_notification(&record, behavior)
            .map_err(CheckinFfiError::from)
    }

    pub fn cancel_notification(&self, id: i32) -> Result<(), CheckinFfiError> {
        self.dispatcher
            .cancel_notification(id)
            .map_err(CheckinFfiError::from)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Runtime continuity API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Called by the main entry point after it created and started its runtime,
    /// so prompts borrow it instead of starting a second one.
    pub fn register_primary_runtime(&self, runtime: Arc<dyn UiRuntime>) {
        self.cache.put(&self.config.engine_id, runtime);
        info!(engine_id = %self.config.engine_id, "Primary UI runtime registered");
    }

    /// Drops the cache entry. The caller still owns and destroys the runtime.
    pub fn release_primary_runtime(&self) {
        if self.cache.remove(&self.config.engine_id).is_some() {
            info!(engine_id = %self.config.engine_id, "Primary UI runtime released");
        }
    }

    pub fn has_live_runtime(&self) -> bool {
        self.cache.contains(&self.config.engine_id)
    }

    pub fn activate_prompt(
        &self,
        alarm: AlarmRecord,
    ) -> Result<Arc<PromptSession>, CheckinFfiError> {
        self.start_prompt(alarm).map_err(CheckinFfiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuity::ContinuityState;
    use crate::questionnaire::Question;
    use crate::testing::{
        FakeNotificationService, FakeRuntimeFactory, FakeTimerService, FakeUiRuntime,
    };

    struct Fixture {
        timer: Arc<FakeTimerService>,
        notifications: Arc<FakeNotificationService>,
        factory: Arc<FakeRuntimeFactory>,
        engine: CheckinEngine,
    }

    fn setup() -> Fixture {
        let timer = Arc::new(FakeTimerService::default());
        let notifications = Arc::new(FakeNotificationService::default());
        let factory = Arc::new(FakeRuntimeFactory::default());
        let engine = CheckinEngine::with_parts(
            CheckinConfig::default(),
            timer.clone(),
            notifications.clone(),
            factory.clone(),
            Arc::new(RuntimeCache::new()),
        );
        Fixture {
            timer,
            notifications,
            factory,
            engine,
        }
    }

    /// Fires the pending wake the way a host timer would.
    fn fire(fx: &Fixture, alarm_id: i32) {
        let registration = fx.timer.pending(alarm_id).expect("pending wake");
        fx.engine.on_wake(registration.payload);
    }

    #[test]
    fn method_call_schedules_and_wake_posts() {
        let fx = setup();
        let result = fx
            .engine
            .handle_method_call(
                "scheduleAlarm".to_string(),
                Some(r#"{"triggerTime": 1000, "behavior": "Vibrate"}"#.to_string()),
            )
            .expect("scheduled");
        assert_eq!(result, "null");

        fire(&fx, 1);
        let posted = fx.notifications.posted(1).expect("posted");
        assert_eq!(posted.channel_id, crate::channels::CHANNEL_ID_VIBRATE_ONLY);
        assert_eq!(posted.text, "Time for your check-in!");
    }

    #[test]
    fn method_call_errors_keep_their_codes() {
        let fx = setup();
        let err = fx
            .engine
            .handle_method_call("scheduleAlarm".to_string(), None)
            .unwrap_err();
        assert!(matches!(err, CheckinFfiError::InvalidArgument { .. }));

        let err = fx
            .engine
            .handle_method_call("rescheduleAll".to_string(), None)
            .unwrap_err();
        assert!(matches!(err, CheckinFfiError::NotImplemented { .. }));

        let err = fx
            .engine
            .handle_method_call("scheduleAlarm".to_string(), Some("{".to_string()))
            .unwrap_err();
        assert!(matches!(err, CheckinFfiError::InvalidArgument { .. }));
    }

    #[test]
    fn cancel_alarm_removes_pending_wake() {
        let fx = setup();
        fx.engine.schedule_alarm(1_000, "Silent".to_string());
        fx.engine.cancel_alarm();
        assert_eq!(fx.timer.pending_count(), 0);
    }

    #[test]
    fn primary_runtime_is_borrowed_by_prompts() {
        let fx = setup();
        let primary = Arc::new(FakeUiRuntime::default());
        fx.engine.register_primary_runtime(primary.clone());
        assert!(fx.engine.has_live_runtime());

        let session = fx
            .engine
            .activate_prompt(AlarmRecord::new(1, "check in"))
            .expect("session");
        assert_eq!(session.continuity_state(), ContinuityState::Reused);
        session.decline().expect("declined");

        assert_eq!(fx.factory.created(), 0);
        assert_eq!(primary.destroy_calls(), 0);
        assert_eq!(primary.invocations().len(), 1);

        fx.engine.release_primary_runtime();
        assert!(!fx.engine.has_live_runtime());
    }

    #[test]
    fn answered_prompt_clears_notification() {
        let fx = setup();
        fx.engine.schedule_alarm(1_000, "Silent".to_string());
        fire(&fx, 1);
        assert!(fx.notifications.posted(1).is_some());

        let session = fx
            .engine
            .activate_prompt(AlarmRecord::new(1, "Time for your check-in!"))
            .expect("session");
        assert_eq!(session.continuity_state(), ContinuityState::ColdStart);
        session.set_additional_info("ok".to_string()).unwrap();
        session.select_option(Question::Feeling, 2).unwrap();
        session.select_option(Question::SleepQuality, 3).unwrap();

        assert!(fx.notifications.posted(1).is_none());
        let runtime = fx.factory.last().expect("runtime");
        assert_eq!(runtime.destroy_calls(), 1);
        assert!(!fx.engine.has_live_runtime());
    }

    #[test]
    fn register_channels_declares_all_three() {
        let fx = setup();
        fx.engine.register_channels().expect("registered");
        assert_eq!(fx.notifications.channel_ids().len(), 3);
    }
}
