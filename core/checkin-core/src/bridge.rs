//! Method-call bridge between the UI layer and the alarm scheduler.
//!
//! The UI layer calls `scheduleAlarm` and `cancelAlarm` by name; everything
//! here resolves to the single configured alarm record. Parameter validation
//! is the only failure the caller ever sees: scheduling itself reports nothing.

use std::sync::Arc;

use checkin_protocol::{
    parse_schedule_alarm, Method, Request, Response, NOT_IMPLEMENTED, PROTOCOL_MISMATCH,
    PROTOCOL_VERSION,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::CheckinConfig;
use crate::error::{CheckinError, Result};
use crate::scheduler::AlarmScheduler;
use crate::types::BehaviorTag;

pub struct AlarmBridge {
    scheduler: Arc<AlarmScheduler>,
    config: CheckinConfig,
}

impl AlarmBridge {
    pub fn new(scheduler: Arc<AlarmScheduler>, config: CheckinConfig) -> Self {
        Self { scheduler, config }
    }

    pub fn config(&self) -> &CheckinConfig {
        &self.config
    }

    /// Dispatches a boundary call by its method name.
    pub fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match Method::from_name(method) {
            Some(method) => self.dispatch(method, params),
            None => Err(CheckinError::UnknownMethod(method.to_string())),
        }
    }

    /// Answers one socket request. Methods outside the bridge's surface are
    /// reported as not implemented; hosts layer their own on top.
    pub fn handle(&self, request: Request) -> Response {
        if request.protocol_version != PROTOCOL_VERSION {
            warn!(
                version = request.protocol_version,
                expected = PROTOCOL_VERSION,
                "Protocol version mismatch"
            );
            return Response::error(
                request.id,
                PROTOCOL_MISMATCH,
                format!("Unsupported protocol version {}", request.protocol_version),
            );
        }

        match self.dispatch(request.method, request.params) {
            Ok(data) => Response::ok(request.id, data),
            Err(CheckinError::InvalidRequest { code, message }) => {
                Response::error(request.id, &code, message)
            }
            Err(CheckinError::UnknownMethod(method)) => Response::error(
                request.id,
                NOT_IMPLEMENTED,
                format!("{} is not handled by the alarm bridge", method),
            ),
            Err(err) => Response::error(request.id, "ERROR", err.to_string()),
        }
    }

    fn dispatch(&self, method: Method, params: Option<Value>) -> Result<Value> {
        debug!(method = ?method, "Boundary call");
        match method {
            Method::GetHealth => Ok(self.health()),
            Method::ScheduleAlarm => {
                let parsed = parse_schedule_alarm(params)?;
                let behavior = parsed
                    .behavior
                    .as_deref()
                    .map(BehaviorTag::from_wire)
                    .unwrap_or_else(|| self.config.default_behavior());
                self.scheduler
                    .schedule(&self.config.alarm_record(), parsed.trigger_time, behavior);
                Ok(Value::Null)
            }
            Method::CancelAlarm => {
                self.scheduler.cancel(&self.config.alarm_record());
                Ok(Value::Null)
            }
            other => Err(CheckinError::UnknownMethod(format!("{:?}", other))),
        }
    }

    fn health(&self) -> Value {
        json!({
            "status": "ok",
            "protocolVersion": PROTOCOL_VERSION,
            "methodChannel": self.config.method_channel,
            "alarmId": self.config.alarm_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTimerService;
    use checkin_protocol::{WakePayload, INVALID_ARGUMENT};

    fn setup() -> (Arc<FakeTimerService>, AlarmBridge) {
        let timer = Arc::new(FakeTimerService::default());
        let scheduler = Arc::new(AlarmScheduler::new(timer.clone()));
        (timer, AlarmBridge::new(scheduler, CheckinConfig::default()))
    }

    fn request(method: Method, params: Option<Value>) -> Request {
        Request {
            protocol_version: PROTOCOL_VERSION,
            method,
            id: Some("req-1".to_string()),
            params,
        }
    }

    #[test]
    fn schedule_registers_configured_alarm() {
        let (timer, bridge) = setup();
        let response = bridge.handle(request(
            Method::ScheduleAlarm,
            Some(json!({"triggerTime": 1_700_000_000_000_i64, "behavior": "Silent"})),
        ));

        assert!(response.ok);
        assert_eq!(response.id.as_deref(), Some("req-1"));
        let pending = timer.pending(1).expect("pending wake");
        assert_eq!(pending.trigger_at_millis, 1_700_000_000_000);
        let payload = WakePayload::decode(&pending.payload).unwrap();
        assert_eq!(payload.alarm_message, "Time for your check-in!");
        assert_eq!(payload.notification_behavior.as_deref(), Some("Silent"));
    }

    #[test]
    fn schedule_without_trigger_time_is_invalid_argument() {
        let (timer, bridge) = setup();
        let response = bridge.handle(request(Method::ScheduleAlarm, Some(json!({}))));

        assert!(!response.ok);
        let error = response.error.expect("error info");
        assert_eq!(error.code, INVALID_ARGUMENT);
        assert_eq!(error.message, "triggerTime cannot be null");
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn missing_behavior_schedules_default() {
        let (timer, bridge) = setup();
        bridge
            .call("scheduleAlarm", Some(json!({"triggerTime": 5})))
            .expect("scheduled");
        let payload = WakePayload::decode(&timer.pending(1).unwrap().payload).unwrap();
        assert_eq!(payload.notification_behavior.as_deref(), Some("VibrateAndSound"));
    }

    #[test]
    fn missing_behavior_uses_configured_default() {
        let timer = Arc::new(FakeTimerService::default());
        let scheduler = Arc::new(AlarmScheduler::new(timer.clone()));
        let config = CheckinConfig {
            default_behavior: "Silent".to_string(),
            ..CheckinConfig::default()
        };
        let bridge = AlarmBridge::new(scheduler, config);

        bridge
            .call("scheduleAlarm", Some(json!({"triggerTime": 5})))
            .expect("scheduled");
        let payload = WakePayload::decode(&timer.pending(1).unwrap().payload).unwrap();
        assert_eq!(payload.notification_behavior.as_deref(), Some("Silent"));

        bridge
            .call(
                "scheduleAlarm",
                Some(json!({"triggerTime": 5, "behavior": "Vibrate"})),
            )
            .expect("scheduled");
        let payload = WakePayload::decode(&timer.pending(1).unwrap().payload).unwrap();
        assert_eq!(payload.notification_behavior.as_deref(), Some("Vibrate"));
    }

    #[test]
    fn extreme_trigger_times_are_passed_through() {
        let (timer, bridge) = setup();
        for trigger in [i64::MAX, i64::MIN] {
            bridge
                .call("scheduleAlarm", Some(json!({"triggerTime": trigger})))
                .expect("scheduled");
            assert_eq!(timer.pending(1).unwrap().trigger_at_millis, trigger);
        }
        assert_eq!(timer.pending_count(), 1);
    }

    #[test]
    fn cancel_removes_pending_and_is_repeatable() {
        let (timer, bridge) = setup();
        bridge
            .call("scheduleAlarm", Some(json!({"triggerTime": 5})))
            .unwrap();
        assert!(bridge.handle(request(Method::CancelAlarm, None)).ok);
        assert!(bridge.handle(request(Method::CancelAlarm, None)).ok);
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn unknown_method_name_is_not_implemented() {
        let (_timer, bridge) = setup();
        let err = bridge.call("snoozeAlarm", None).unwrap_err();
        assert!(matches!(err, CheckinError::UnknownMethod(_)));

        let response = bridge.handle(request(Method::PollEvents, None));
        assert_eq!(response.error.unwrap().code, NOT_IMPLEMENTED);
    }

    #[test]
    fn protocol_mismatch_is_rejected() {
        let (_timer, bridge) = setup();
        let mut req = request(Method::GetHealth, None);
        req.protocol_version = 99;
        let response = bridge.handle(req);
        assert_eq!(response.error.unwrap().code, PROTOCOL_MISMATCH);
    }

    #[test]
    fn health_reports_channel_and_alarm() {
        let (_timer, bridge) = setup();
        let data = bridge.call("getHealth", None).unwrap();
        assert_eq!(data["status"], "ok");
        assert_eq!(data["methodChannel"], "checkin/alarm_manager");
        assert_eq!(data["alarmId"], 1);
    }
}
