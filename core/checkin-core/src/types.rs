//! Core types shared by every host of the check-in alarm.
//!
//! **FFI Support:** All types are annotated with UniFFI macros so Kotlin and
//! Swift hosts see the same shapes the Rust code uses.

use checkin_protocol::{AnswerData, QuestionnaireFinished, WakePayload};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// Alarm Record
// ═══════════════════════════════════════════════════════════════════════════════

/// The alarm a wake is scheduled for.
///
/// Has no storage of its own: it travels inside the wake registration and is
/// rebuilt from the wake payload when the wake fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct AlarmRecord {
    pub id: i32,
    pub message: String,
}

impl AlarmRecord {
    pub fn new(id: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub(crate) fn to_wake_payload(&self, behavior: BehaviorTag) -> WakePayload {
        WakePayload {
            alarm_id: self.id,
            alarm_message: self.message.clone(),
            notification_behavior: Some(behavior.as_wire().to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Behavior Tag
// ═══════════════════════════════════════════════════════════════════════════════

/// How a posted alarm should announce itself.
///
/// Crosses the boundary as a string; anything unrecognised becomes
/// `SoundAndVibrate`. Conversion happens at the boundary only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, uniffi::Enum,
)]
pub enum BehaviorTag {
    #[default]
    SoundAndVibrate,
    VibrateOnly,
    Silent,
}

impl BehaviorTag {
    pub const ALL: [BehaviorTag; 3] = [
        BehaviorTag::SoundAndVibrate,
        BehaviorTag::VibrateOnly,
        BehaviorTag::Silent,
    ];

    /// Case-insensitive parse of a boundary behavior string.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "vibrate" => BehaviorTag::VibrateOnly,
            "silent" => BehaviorTag::Silent,
            "vibrateandsound" => BehaviorTag::SoundAndVibrate,
            other => {
                tracing::debug!(behavior = %other, "Unknown alarm behavior; using default");
                BehaviorTag::default()
            }
        }
    }

    /// Missing behavior means the default.
    pub fn from_optional_wire(value: Option<&str>) -> Self {
        value.map(Self::from_wire).unwrap_or_default()
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            BehaviorTag::SoundAndVibrate => "VibrateAndSound",
            BehaviorTag::VibrateOnly => "Vibrate",
            BehaviorTag::Silent => "Silent",
        }
    }
}

/// Parses a boundary behavior string for foreign hosts.
#[uniffi::export]
pub fn behavior_from_wire(value: String) -> BehaviorTag {
    BehaviorTag::from_wire(&value)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prompt Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured answers collected by the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct CheckinAnswers {
    pub feeling: i32,
    pub sleep_quality: i32,
    pub additional_info: String,
}

/// The single decision a prompt session relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum PromptOutcome {
    Answered { answers: CheckinAnswers },
    Declined,
    Snoozed,
}

impl PromptOutcome {
    pub fn status(&self) -> &'static str {
        self.to_wire().status()
    }

    pub fn to_wire(&self) -> QuestionnaireFinished {
        match self {
            PromptOutcome::Answered { answers } => QuestionnaireFinished::Answered {
                data: AnswerData {
                    feeling: answers.feeling,
                    sleep_quality: answers.sleep_quality,
                    additional_info: answers.additional_info.clone(),
                },
            },
            PromptOutcome::Declined => QuestionnaireFinished::Declined,
            PromptOutcome::Snoozed => QuestionnaireFinished::Snoozed,
        }
    }
}

impl From<QuestionnaireFinished> for PromptOutcome {
    fn from(value: QuestionnaireFinished) -> Self {
        match value {
            QuestionnaireFinished::Answered { data } => PromptOutcome::Answered {
                answers: CheckinAnswers {
                    feeling: data.feeling,
                    sleep_quality: data.sleep_quality,
                    additional_info: data.additional_info,
                },
            },
            QuestionnaireFinished::Declined => PromptOutcome::Declined,
            QuestionnaireFinished::Snoozed => PromptOutcome::Snoozed,
        }
    }
}
