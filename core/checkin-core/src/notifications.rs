//! Notification dispatcher.
//!
//! Builds the alarm notification for a behavior and posts or cancels it by
//! alarm id. The notification is ongoing and not auto-cancelable so the user
//! has to resolve it through the full-screen prompt.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::channels::{channel_for, register_channels, ChannelSpec};
use crate::error::{CheckinError, CheckinFfiError, Result};
use crate::types::{AlarmRecord, BehaviorTag};

pub const NOTIFICATION_TITLE: &str = "Alarm";
pub const NOTIFICATION_CATEGORY: &str = "alarm";
/// Target the full-screen action opens.
pub const PROMPT_TARGET: &str = "alarm_prompt";

/// Host notification center.
///
/// `notify` replaces any notification already posted under the same id;
/// `cancel` of an unknown id is a no-op.
#[uniffi::export(with_foreign)]
pub trait NotificationService: Send + Sync {
    fn create_channel(&self, spec: ChannelSpec) -> std::result::Result<(), CheckinFfiError>;

    fn notify(
        &self,
        id: i32,
        notification: Notification,
    ) -> std::result::Result<(), CheckinFfiError>;

    fn cancel(&self, id: i32) -> std::result::Result<(), CheckinFfiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum NotificationPriority {
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum LaunchFlag {
    NewTask,
    NoUserAction,
    ExcludeFromRecents,
}

/// Launch action attached to the notification; opens the prompt directly
/// over the lock screen when the host allows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct FullScreenAction {
    pub target: String,
    pub alarm_id: i32,
    pub alarm_message: String,
    pub request_code: i32,
    pub launch_flags: Vec<LaunchFlag>,
    pub update_current: bool,
    pub immutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Notification {
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub priority: NotificationPriority,
    pub category: String,
    pub full_screen_action: FullScreenAction,
    pub ongoing: bool,
    pub auto_cancel: bool,
}

/// Builds the alarm notification without posting it.
pub fn build_notification(record: &AlarmRecord, behavior: BehaviorTag) -> Notification {
    let channel = channel_for(behavior);
    Notification {
        channel_id: channel.id.to_string(),
        title: NOTIFICATION_TITLE.to_string(),
        text: record.message.clone(),
        priority: NotificationPriority::Max,
        category: NOTIFICATION_CATEGORY.to_string(),
        full_screen_action: FullScreenAction {
            target: PROMPT_TARGET.to_string(),
            alarm_id: record.id,
            alarm_message: record.message.clone(),
            request_code: record.id,
            launch_flags: vec![
                LaunchFlag::NewTask,
                LaunchFlag::NoUserAction,
                LaunchFlag::ExcludeFromRecents,
            ],
            update_current: true,
            immutable: true,
        },
        ongoing: true,
        auto_cancel: false,
    }
}

pub struct NotificationDispatcher {
    service: Arc<dyn NotificationService>,
    channels_ready: OnceCell<()>,
}

impl NotificationDispatcher {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self {
            service,
            channels_ready: OnceCell::new(),
        }
    }

    /// Declares the channel table once for this dispatcher.
    ///
    /// A failed attempt is retried on the next call.
    pub fn ensure_channels(&self) -> Result<()> {
        self.channels_ready
            .get_or_try_init(|| register_channels(self.service.as_ref()))
            .map(|_| ())
    }

    /// Declares the channel table unconditionally.
    pub fn register_channels(&self) -> Result<()> {
        register_channels(self.service.as_ref())?;
        let _ = self.channels_ready.set(());
        Ok(())
    }

    /// Posts the alarm notification, replacing any earlier one for `record.id`.
    pub fn show_notification(&self, record: &AlarmRecord, behavior: BehaviorTag) -> Result<()> {
        if let Err(err) = self.ensure_channels() {
            // Posting still goes ahead; hosts without channel support ignore it.
            warn!(error = %err, "Channel registration failed before posting alarm");
        }

        let notification = build_notification(record, behavior);
        info!(
            alarm_id = record.id,
            channel_id = %notification.channel_id,
            behavior = ?behavior,
            "Posting alarm notification"
        );
        self.service
            .notify(record.id, notification)
            .map_err(|err| CheckinError::host("notify", err))
    }

    pub fn cancel_notification(&self, id: i32) -> Result<()> {
        debug!(alarm_id = id, "Cancelling alarm notification");
        self.service
            .cancel(id)
            .map_err(|err| CheckinError::host("cancel_notification", err))
    }
}
