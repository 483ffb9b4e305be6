//! # checkin-core
//!
//! Core library for the check-in alarm: schedules a wall-clock wake,
//! turns the wake into an urgent notification, opens the check-in prompt on
//! top of either the live UI runtime or a freshly started one, and relays the
//! user's single decision back into that runtime.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Wake handling must finish
//!   inside the host's short callback budget.
//! - **Hosts behind traits**: the OS timer, the notification center and the UI
//!   runtime are [`TimerService`], [`NotificationService`] and [`UiRuntime`].
//!   Mobile shells implement them in Kotlin/Swift; the desktop daemon and the
//!   tests implement them in Rust.
//! - **Degrade, don't raise**: only a missing `triggerTime` reaches the caller
//!   as an error. Unknown behaviors, absent cancel targets and failed posts
//!   fall back to a default and get logged.
//! - **FFI-ready**: UniFFI annotations enable Swift and Kotlin bindings.
//!   Prefer additive public API changes; removing or renaming breaks hosts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkin_core::CheckinEngine;
//!
//! let engine = CheckinEngine::new(timer, notifications, runtime_factory);
//! engine.register_channels()?;
//! engine.handle_method_call("scheduleAlarm".into(), Some(r#"{"triggerTime":1700000000000}"#.into()))?;
//! ```

// UniFFI scaffolding for Swift/Kotlin bindings
uniffi::setup_scaffolding!();

// Public modules
pub mod bridge;
pub mod channels;
pub mod config;
pub mod continuity;
pub mod engine;
pub mod error;
pub mod notifications;
pub mod prompt;
pub mod questionnaire;
pub mod receiver;
pub mod relay;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use bridge::AlarmBridge;
pub use channels::{channel_for, channel_specs, register_channels, ChannelSpec, CHANNELS};
pub use config::*;
pub use continuity::{ContinuityState, RuntimeCache, RuntimeLease, UiRuntime, UiRuntimeFactory};
pub use engine::CheckinEngine;
pub use error::{CheckinError, CheckinFfiError, Result};
pub use notifications::{
    build_notification, FullScreenAction, LaunchFlag, Notification, NotificationDispatcher,
    NotificationPriority, NotificationService,
};
pub use prompt::PromptSession;
pub use questionnaire::{Question, QuestionnaireState};
pub use receiver::WakeReceiver;
pub use relay::ResponseRelay;
pub use scheduler::{AlarmScheduler, TimerService, WakeClock, WakeRegistration};
pub use types::*;
