//! Wire types shared by the check-in core, the desktop daemon and its clients.
//!
//! Every process that talks about alarms uses these types so the schema cannot
//! drift between the UI boundary, the wake payload and the socket protocol.
//! Validation lives next to the types: callers get a structured `ErrorInfo`
//! they can hand straight back across the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

/// Method invoked on the UI runtime when a prompt session resolves.
pub const QUESTIONNAIRE_FINISHED: &str = "questionnaireFinished";

pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
pub const PROTOCOL_MISMATCH: &str = "PROTOCOL_MISMATCH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    ScheduleAlarm,
    CancelAlarm,
    ListNotifications,
    SubmitDecision,
    PollEvents,
}

impl Method {
    /// Resolves a boundary method name (`"scheduleAlarm"`) to a `Method`.
    pub fn from_name(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// scheduleAlarm
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAlarmParams {
    #[serde(default)]
    pub trigger_time: Option<i64>,
    #[serde(default)]
    pub behavior: Option<String>,
}

/// A validated `scheduleAlarm` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAlarm {
    /// Absolute wall-clock trigger, epoch milliseconds.
    pub trigger_time: i64,
    /// Raw behavior string, `None` when absent or blank. Normalisation and
    /// the fallback to the configured default happen in the core.
    pub behavior: Option<String>,
}

pub fn parse_schedule_alarm(params: Option<Value>) -> Result<ScheduleAlarm, ErrorInfo> {
    let params: ScheduleAlarmParams = match params {
        Some(Value::Null) | None => ScheduleAlarmParams::default(),
        Some(value) => serde_json::from_value(value).map_err(|err| {
            ErrorInfo::new(
                INVALID_ARGUMENT,
                format!("scheduleAlarm arguments are invalid: {}", err),
            )
        })?,
    };

    let trigger_time = params
        .trigger_time
        .ok_or_else(|| ErrorInfo::new(INVALID_ARGUMENT, "triggerTime cannot be null"))?;

    let behavior = params
        .behavior
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(ScheduleAlarm {
        trigger_time,
        behavior,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Wake payload
// ─────────────────────────────────────────────────────────────────────────────

/// Data attached to a scheduled wake and handed back when it fires.
///
/// The host treats the encoded form as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakePayload {
    pub alarm_id: i32,
    #[serde(default)]
    pub alarm_message: String,
    #[serde(default)]
    pub notification_behavior: Option<String>,
}

impl WakePayload {
    pub fn encode(&self) -> Result<String, ErrorInfo> {
        serde_json::to_string(self).map_err(|err| {
            ErrorInfo::new(
                "payload_encode_failed",
                format!("failed to encode wake payload: {}", err),
            )
        })
    }

    pub fn decode(raw: &str) -> Result<Self, ErrorInfo> {
        serde_json::from_str(raw).map_err(|err| {
            ErrorInfo::new(
                "invalid_payload",
                format!("wake payload is invalid JSON: {}", err),
            )
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// questionnaireFinished
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerData {
    pub feeling: i32,
    pub sleep_quality: i32,
    #[serde(default)]
    pub additional_info: String,
}

/// Payload of the single `questionnaireFinished` call per prompt session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionnaireFinished {
    Answered { data: AnswerData },
    Declined,
    Snoozed,
}

impl QuestionnaireFinished {
    pub fn status(&self) -> &'static str {
        match self {
            QuestionnaireFinished::Answered { .. } => "answered",
            QuestionnaireFinished::Declined => "declined",
            QuestionnaireFinished::Snoozed => "snoozed",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Daemon-only methods
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmitDecisionParams {
    pub alarm_id: i32,
    pub result: QuestionnaireFinished,
}

pub fn parse_submit_decision(params: Option<Value>) -> Result<SubmitDecisionParams, ErrorInfo> {
    let params =
        params.ok_or_else(|| ErrorInfo::new(INVALID_ARGUMENT, "alarmId and result are required"))?;
    serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            INVALID_ARGUMENT,
            format!("submitDecision payload is invalid: {}", err),
        )
    })
}

/// A message the core sent toward the UI runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub method: String,
    pub payload: Value,
    pub sent_at: String,
}
