//! Prompt session: one activation of the full-screen check-in prompt.
//!
//! Activation secures a UI runtime through the continuity manager, the
//! questionnaire collects input, and the first of answered/declined/snoozed
//! is relayed. Resolving also finishes the session, so the remaining exits
//! are unreachable afterwards.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::continuity::{ContinuityState, RuntimeCache, RuntimeLease, UiRuntimeFactory};
use crate::error::{CheckinError, CheckinFfiError, Result};
use crate::notifications::NotificationDispatcher;
use crate::questionnaire::{Question, QuestionnaireState};
use crate::relay::ResponseRelay;
use crate::types::{AlarmRecord, PromptOutcome};

struct SessionInner {
    questionnaire: QuestionnaireState,
    lease: Option<RuntimeLease>,
    outcome: Option<PromptOutcome>,
}

#[derive(uniffi::Object)]
pub struct PromptSession {
    alarm: AlarmRecord,
    continuity: ContinuityState,
    relay: ResponseRelay,
    inner: Mutex<SessionInner>,
}

impl PromptSession {
    pub fn activate(
        alarm: AlarmRecord,
        cache: &Arc<RuntimeCache>,
        engine_id: &str,
        factory: &dyn UiRuntimeFactory,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Result<Arc<Self>> {
        let lease = cache.acquire_or_create(engine_id, factory)?;
        let continuity = lease.state();
        let relay = ResponseRelay::new(alarm.id, Arc::clone(lease.runtime()), dispatcher);
        info!(alarm_id = alarm.id, continuity = ?continuity, "Prompt session activated");

        Ok(Arc::new(Self {
            alarm,
            continuity,
            relay,
            inner: Mutex::new(SessionInner {
                questionnaire: QuestionnaireState::new(),
                lease: Some(lease),
                outcome: None,
            }),
        }))
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_open(&self, inner: &SessionInner) -> Result<()> {
        if inner.outcome.is_some() || inner.lease.is_none() {
            return Err(CheckinError::AlreadyResolved {
                alarm_id: self.alarm.id,
            });
        }
        Ok(())
    }

    /// Relays `outcome` and tears the session down. The session counts as
    /// resolved even if the send failed; the error is returned to the caller.
    pub fn resolve(&self, outcome: PromptOutcome) -> Result<()> {
        let mut inner = self.lock();
        self.ensure_open(&inner)?;

        let sent = self.relay.send_result(&outcome);
        inner.outcome = Some(outcome);
        if let Some(lease) = inner.lease.take() {
            lease.release();
        }
        sent
    }

    pub fn select(&self, question: Question, option: i32) -> Result<Option<PromptOutcome>> {
        let answers = {
            let mut inner = self.lock();
            self.ensure_open(&inner)?;
            inner.questionnaire.select(question, option)?
        };

        match answers {
            Some(answers) => {
                let outcome = PromptOutcome::Answered { answers };
                self.resolve(outcome.clone())?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }
}

#[uniffi::export]
impl PromptSession {
    pub fn alarm_id(&self) -> i32 {
        self.alarm.id
    }

    pub fn alarm_message(&self) -> String {
        self.alarm.message.clone()
    }

    pub fn continuity_state(&self) -> ContinuityState {
        self.continuity
    }

    /// Records an answer; answering the second question resolves the session.
    pub fn select_option(
        &self,
        question: Question,
        option: i32,
    ) -> std::result::Result<Option<PromptOutcome>, CheckinFfiError> {
        self.select(question, option).map_err(CheckinFfiError::from)
    }

    pub fn set_additional_info(&self, text: String) -> std::result::Result<(), CheckinFfiError> {
        let mut inner = self.lock();
        self.ensure_open(&inner)?;
        inner.questionnaire.set_additional_info(text);
        Ok(())
    }

    pub fn decline(&self) -> std::result::Result<(), CheckinFfiError> {
        self.resolve(PromptOutcome::Declined)
            .map_err(CheckinFfiError::from)
    }

    pub fn snooze(&self) -> std::result::Result<(), CheckinFfiError> {
        self.resolve(PromptOutcome::Snoozed)
            .map_err(CheckinFfiError::from)
    }

    pub fn outcome(&self) -> Option<PromptOutcome> {
        self.lock().outcome.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().lease.is_none()
    }

    /// Host teardown (the prompt surface went away without a decision).
    pub fn finish(&self) {
        let lease = self.lock().lease.take();
        if let Some(lease) = lease {
            debug!(alarm_id = self.alarm.id, "Prompt session finished");
            lease.release();
        }
    }
}
