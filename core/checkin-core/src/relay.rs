//! Response relay: carries the prompt's single decision into the UI runtime.
//!
//! First decision wins. The notification is cancelled whether or not the
//! send succeeded; a failed send is returned to the caller and never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use checkin_protocol::QUESTIONNAIRE_FINISHED;
use tracing::{info, warn};

use crate::continuity::UiRuntime;
use crate::error::{CheckinError, Result};
use crate::notifications::NotificationDispatcher;
use crate::types::PromptOutcome;

pub struct ResponseRelay {
    alarm_id: i32,
    runtime: Arc<dyn UiRuntime>,
    dispatcher: Arc<NotificationDispatcher>,
    sent: AtomicBool,
}

impl ResponseRelay {
    pub fn new(
        alarm_id: i32,
        runtime: Arc<dyn UiRuntime>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            alarm_id,
            runtime,
            dispatcher,
            sent: AtomicBool::new(false),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }

    /// Sends `{status, data?}` to the runtime, then clears the notification.
    ///
    /// A second call fails with `AlreadyResolved` and has no side effects.
    pub fn send_result(&self, outcome: &PromptOutcome) -> Result<()> {
        if self
            .sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CheckinError::AlreadyResolved {
                alarm_id: self.alarm_id,
            });
        }

        let send = serde_json::to_string(&outcome.to_wire())
            .map_err(|source| CheckinError::Codec {
                context: "questionnaireFinished payload".to_string(),
                source,
            })
            .and_then(|payload| {
                self.runtime
                    .invoke_method(QUESTIONNAIRE_FINISHED.to_string(), payload)
                    .map_err(|err| CheckinError::Relay {
                        method: QUESTIONNAIRE_FINISHED.to_string(),
                        details: err.to_string(),
                    })
            });

        if let Err(err) = self.dispatcher.cancel_notification(self.alarm_id) {
            warn!(alarm_id = self.alarm_id, error = %err, "Failed to clear alarm notification");
        }

        match &send {
            Ok(()) => info!(
                alarm_id = self.alarm_id,
                status = outcome.status(),
                "Prompt decision relayed"
            ),
            Err(err) => warn!(
                alarm_id = self.alarm_id,
                status = outcome.status(),
                error = %err,
                "Prompt decision was not delivered"
            ),
        }
        send
    }
}
