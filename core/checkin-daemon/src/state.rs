//! State owned by the daemon: the engine and the desktop host services
//! plugged into it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use checkin_core::{
    AlarmRecord, CheckinConfig, CheckinEngine, CheckinError, PromptOutcome, Question,
    RuntimeCache, UiRuntime,
};
use checkin_protocol::{ErrorInfo, OutboxMessage, SubmitDecisionParams};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::notifier::{NotificationCenter, PostedNotification};
use crate::outbox::{Outbox, OutboxRuntime, OutboxRuntimeFactory};
use crate::timer::ThreadTimerService;

pub const NO_ACTIVE_NOTIFICATION: &str = "NO_ACTIVE_NOTIFICATION";
pub const ALREADY_RESOLVED: &str = "ALREADY_RESOLVED";
pub const RELAY_FAILED: &str = "RELAY_FAILED";
pub const DECISION_IN_PROGRESS: &str = "DECISION_IN_PROGRESS";

pub struct SharedState {
    engine: Arc<CheckinEngine>,
    timer: ThreadTimerService,
    center: Arc<NotificationCenter>,
    outbox: Arc<Outbox>,
    primary: Mutex<Option<Arc<OutboxRuntime>>>,
    in_flight: Mutex<HashSet<i32>>,
}

/// Marks one alarm as having a decision in progress until dropped.
struct DecisionClaim<'a> {
    in_flight: &'a Mutex<HashSet<i32>>,
    alarm_id: i32,
}

impl Drop for DecisionClaim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.alarm_id);
    }
}

impl SharedState {
    pub fn new(config: CheckinConfig) -> Self {
        let timer = ThreadTimerService::new();
        let center = Arc::new(NotificationCenter::new());
        let outbox = Arc::new(Outbox::default());
        let factory = Arc::new(OutboxRuntimeFactory::new(Arc::clone(&outbox)));

        let engine = Arc::new(CheckinEngine::with_parts(
            config,
            Arc::new(timer.clone()),
            center.clone(),
            factory,
            Arc::new(RuntimeCache::new()),
        ));
        if let Err(err) = engine.register_channels() {
            warn!(error = %err, "Failed to register notification channels");
        }

        Self {
            engine,
            timer,
            center,
            outbox,
            primary: Mutex::new(None),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Starts delivering due wakes into the engine.
    pub fn start_timer(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        self.timer.start(move |wake| engine.on_wake(wake.payload))
    }

    pub fn shutdown(&self) {
        self.timer.shutdown();
        self.release_primary_runtime();
    }

    pub fn engine(&self) -> &CheckinEngine {
        &self.engine
    }

    fn primary(&self) -> MutexGuard<'_, Option<Arc<OutboxRuntime>>> {
        self.primary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts the daemon's own runtime and caches it, as the main entry point
    /// of an app would.
    pub fn register_primary_runtime(&self) -> Result<(), String> {
        let runtime = Arc::new(OutboxRuntime::new(Arc::clone(&self.outbox)));
        runtime
            .execute_default_entrypoint()
            .map_err(|err| format!("Primary runtime failed to start: {}", err))?;
        self.engine.register_primary_runtime(runtime.clone());
        info!(runtime_id = runtime.id(), "Primary runtime running");
        *self.primary() = Some(runtime);
        Ok(())
    }

    pub fn release_primary_runtime(&self) {
        if let Some(runtime) = self.primary().take() {
            self.engine.release_primary_runtime();
            runtime.destroy();
        }
    }

    pub fn health(&self) -> Value {
        let mut data = self
            .engine
            .bridge()
            .call("getHealth", None)
            .unwrap_or_else(|_| json!({ "status": "ok" }));
        data["pid"] = json!(std::process::id());
        data["version"] = json!(env!("CARGO_PKG_VERSION"));
        data["pendingWakes"] = json!(self.timer.pending().len());
        data["activeNotifications"] = json!(self.center.snapshot().len());
        data["liveRuntime"] = json!(self.engine.has_live_runtime());
        data["queuedEvents"] = json!(self.outbox.len());
        data
    }

    pub fn list_notifications(&self) -> Vec<PostedNotification> {
        self.center.snapshot()
    }

    pub fn poll_events(&self) -> Vec<OutboxMessage> {
        self.outbox.drain()
    }

    fn claim_decision(&self, alarm_id: i32) -> Result<DecisionClaim<'_>, ErrorInfo> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(alarm_id) {
            warn!(alarm_id, "Concurrent decision rejected");
            return Err(ErrorInfo::new(
                DECISION_IN_PROGRESS,
                format!("A decision for alarm {} is already being submitted", alarm_id),
            ));
        }
        Ok(DecisionClaim {
            in_flight: &self.in_flight,
            alarm_id,
        })
    }

    /// Opens a prompt session for the posted alarm and resolves it with
    /// `params.result`, as if the user had acted on the full-screen prompt.
    /// At most one decision per alarm runs at a time.
    pub fn submit_decision(&self, params: SubmitDecisionParams) -> Result<Value, ErrorInfo> {
        let _claim = self.claim_decision(params.alarm_id)?;
        let notification = self.center.get(params.alarm_id).ok_or_else(|| {
            ErrorInfo::new(
                NO_ACTIVE_NOTIFICATION,
                format!("No alarm notification is posted for id {}", params.alarm_id),
            )
        })?;

        let action = notification.full_screen_action;
        let session = self
            .engine
            .start_prompt(AlarmRecord::new(action.alarm_id, action.alarm_message))
            .map_err(error_info)?;
        let continuity = session.continuity_state();

        let outcome = PromptOutcome::from(params.result);
        match &outcome {
            PromptOutcome::Answered { answers } => {
                session
                    .set_additional_info(answers.additional_info.clone())
                    .map_err(|err| ErrorInfo::new(err.code(), err.to_string()))?;
                session
                    .select(Question::Feeling, answers.feeling)
                    .map_err(error_info)?;
                session
                    .select(Question::SleepQuality, answers.sleep_quality)
                    .map_err(error_info)?;
            }
            PromptOutcome::Declined | PromptOutcome::Snoozed => {
                session.resolve(outcome.clone()).map_err(error_info)?;
            }
        }

        Ok(json!({
            "alarmId": params.alarm_id,
            "status": outcome.status(),
            "continuity": continuity,
        }))
    }
}

fn error_info(err: CheckinError) -> ErrorInfo {
    match &err {
        CheckinError::InvalidRequest { code, message } => ErrorInfo::new(code, message.clone()),
        CheckinError::AlreadyResolved { .. } => ErrorInfo::new(ALREADY_RESOLVED, err.to_string()),
        CheckinError::Relay { .. } => ErrorInfo::new(RELAY_FAILED, err.to_string()),
        _ => ErrorInfo::new("ERROR", err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::BehaviorTag;
    use checkin_protocol::{AnswerData, QuestionnaireFinished, INVALID_ARGUMENT};

    fn post_alarm(state: &SharedState) {
        state
            .engine()
            .show_notification(
                AlarmRecord::new(1, "Time for your check-in!"),
                BehaviorTag::Silent,
            )
            .unwrap();
    }

    fn answered(feeling: i32, sleep_quality: i32) -> SubmitDecisionParams {
        SubmitDecisionParams {
            alarm_id: 1,
            result: QuestionnaireFinished::Answered {
                data: AnswerData {
                    feeling,
                    sleep_quality,
                    additional_info: "ok".to_string(),
                },
            },
        }
    }

    #[test]
    fn decision_without_notification_is_rejected() {
        let state = SharedState::new(CheckinConfig::default());
        let err = state.submit_decision(answered(2, 3)).unwrap_err();
        assert_eq!(err.code, NO_ACTIVE_NOTIFICATION);
    }

    #[test]
    fn cold_start_decision_reaches_outbox_and_clears_notification() {
        let state = SharedState::new(CheckinConfig::default());
        post_alarm(&state);

        let data = state.submit_decision(answered(2, 3)).unwrap();
        assert_eq!(data["status"], "answered");
        assert_eq!(data["continuity"], "ColdStart");
        assert!(state.list_notifications().is_empty());
        assert!(!state.engine().has_live_runtime());

        let events = state.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].payload,
            json!({
                "status": "answered",
                "data": {"feeling": 2, "sleepQuality": 3, "additionalInfo": "ok"}
            })
        );
        assert!(state.poll_events().is_empty());
    }

    #[test]
    fn primary_runtime_is_reused_and_kept() {
        let state = SharedState::new(CheckinConfig::default());
        state.register_primary_runtime().unwrap();
        post_alarm(&state);

        let data = state
            .submit_decision(SubmitDecisionParams {
                alarm_id: 1,
                result: QuestionnaireFinished::Snoozed,
            })
            .unwrap();
        assert_eq!(data["continuity"], "Reused");
        assert!(state.engine().has_live_runtime());

        state.release_primary_runtime();
        assert!(!state.engine().has_live_runtime());
    }

    #[test]
    fn out_of_range_answer_keeps_notification() {
        let state = SharedState::new(CheckinConfig::default());
        post_alarm(&state);

        let err = state.submit_decision(answered(2, 9)).unwrap_err();
        assert_eq!(err.code, INVALID_ARGUMENT);
        assert_eq!(state.list_notifications().len(), 1);
        assert!(state.poll_events().is_empty());
    }

    #[test]
    fn decision_in_progress_blocks_a_second_submit() {
        let state = SharedState::new(CheckinConfig::default());
        post_alarm(&state);

        let claim = state.claim_decision(1).unwrap();
        let err = state.submit_decision(answered(2, 3)).unwrap_err();
        assert_eq!(err.code, DECISION_IN_PROGRESS);
        assert_eq!(state.list_notifications().len(), 1);
        assert!(state.poll_events().is_empty());
        drop(claim);

        let data = state.submit_decision(answered(2, 3)).unwrap();
        assert_eq!(data["continuity"], "ColdStart");
        let again = state.submit_decision(answered(2, 3)).unwrap_err();
        assert_eq!(again.code, NO_ACTIVE_NOTIFICATION);
        assert_eq!(state.poll_events().len(), 1);
    }

    #[test]
    fn concurrent_submits_relay_one_outcome() {
        let state = Arc::new(SharedState::new(CheckinConfig::default()));
        post_alarm(&state);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.submit_decision(answered(1, 1)).is_ok())
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(state.poll_events().len(), 1);
        assert!(!state.engine().has_live_runtime());
    }

    #[test]
    fn health_reports_host_counters() {
        let state = SharedState::new(CheckinConfig::default());
        state.engine().schedule_alarm(4_102_444_800_000, "Silent".to_string());
        let health = state.health();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["pendingWakes"], 1);
        assert_eq!(health["liveRuntime"], false);
    }
}
