//! Alarm scheduler.
//!
//! Registers one exact, idle-surviving wake per alarm id with the host timer
//! service. The record and behavior ride along as an opaque payload so the
//! wake receiver can rebuild them without any local state.

use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::CheckinFfiError;
use crate::types::{AlarmRecord, BehaviorTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum WakeClock {
    /// Wall-clock time; wakes the device if asleep.
    RtcWakeup,
}

/// A one-shot wake handed to the host timer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct WakeRegistration {
    pub alarm_id: i32,
    pub trigger_at_millis: i64,
    pub clock: WakeClock,
    /// Encoded wake payload; returned verbatim when the wake fires.
    pub payload: String,
}

/// Host timer service.
///
/// Registrations are keyed by `alarm_id`: registering again replaces the
/// pending one, and cancelling an id with nothing pending does nothing.
/// Triggers in the past fire as soon as possible.
#[uniffi::export(with_foreign)]
pub trait TimerService: Send + Sync {
    fn set_exact_and_allow_while_idle(
        &self,
        registration: WakeRegistration,
    ) -> Result<(), CheckinFfiError>;

    fn cancel(&self, alarm_id: i32) -> Result<(), CheckinFfiError>;
}

pub struct AlarmScheduler {
    timer: Arc<dyn TimerService>,
}

impl AlarmScheduler {
    pub fn new(timer: Arc<dyn TimerService>) -> Self {
        Self { timer }
    }

    /// Schedules (or reschedules) the wake for `record.id`.
    ///
    /// Nothing is reported back to the caller: delivery is the host's
    /// concern, so failures are logged and dropped.
    pub fn schedule(&self, record: &AlarmRecord, trigger_at_millis: i64, behavior: BehaviorTag) {
        let payload = match record.to_wake_payload(behavior).encode() {
            Ok(payload) => payload,
            Err(err) => {
                error!(alarm_id = record.id, error = %err.message, "Failed to encode wake payload");
                return;
            }
        };

        let registration = WakeRegistration {
            alarm_id: record.id,
            trigger_at_millis,
            clock: WakeClock::RtcWakeup,
            payload,
        };

        match self.timer.set_exact_and_allow_while_idle(registration) {
            Ok(()) => info!(
                alarm_id = record.id,
                trigger_at = %format_millis(trigger_at_millis),
                behavior = behavior.as_wire(),
                "Alarm scheduled"
            ),
            Err(err) => error!(alarm_id = record.id, error = %err, "Failed to schedule alarm"),
        }
    }

    /// Cancels any pending wake for `record.id`. Matched by id only.
    pub fn cancel(&self, record: &AlarmRecord) {
        match self.timer.cancel(record.id) {
            Ok(()) => debug!(alarm_id = record.id, "Alarm cancelled"),
            Err(err) => error!(alarm_id = record.id, error = %err, "Failed to cancel alarm"),
        }
    }
}

pub(crate) fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
