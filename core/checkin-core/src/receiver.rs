//! Wake receiver: the entry point the host calls when a scheduled wake fires.
//!
//! Runs inside the host's short callback budget, so it stays synchronous and
//! never waits on anything but the notification post itself.

use std::sync::Arc;

use checkin_protocol::WakePayload;
use tracing::{info, warn};

use crate::error::Result;
use crate::notifications::NotificationDispatcher;
use crate::types::{AlarmRecord, BehaviorTag};

pub struct WakeReceiver {
    dispatcher: Arc<NotificationDispatcher>,
    fallback_message: String,
}

impl WakeReceiver {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, fallback_message: impl Into<String>) -> Self {
        Self {
            dispatcher,
            fallback_message: fallback_message.into(),
        }
    }

    /// Decodes the wake payload and posts the alarm notification.
    ///
    /// Fire-and-forget: an undecodable payload or a failed post is logged and
    /// dropped, never raised into the host callback.
    pub fn on_receive(&self, payload: &str) {
        match self.try_receive(payload) {
            Ok(record) => info!(alarm_id = record.id, "Wake delivered"),
            Err(err) => warn!(error = %err, "Wake dropped"),
        }
    }

    fn try_receive(&self, payload: &str) -> Result<AlarmRecord> {
        let payload = WakePayload::decode(payload)?;
        let behavior = BehaviorTag::from_optional_wire(payload.notification_behavior.as_deref());
        let message = if payload.alarm_message.trim().is_empty() {
            self.fallback_message.clone()
        } else {
            payload.alarm_message
        };

        let record = AlarmRecord::new(payload.alarm_id, message);
        self.dispatcher.show_notification(&record, behavior)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{CHANNEL_ID_SILENT, CHANNEL_ID_VIBRATE_AND_SOUND};
    use crate::testing::FakeNotificationService;

    fn setup() -> (Arc<FakeNotificationService>, WakeReceiver) {
        let service = Arc::new(FakeNotificationService::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(service.clone()));
        (service, WakeReceiver::new(dispatcher, "Time for your check-in!"))
    }

    #[test]
    fn wake_posts_notification_on_payload_channel() {
        let (service, receiver) = setup();
        receiver.on_receive(
            r#"{"alarmId":1,"alarmMessage":"hello","notificationBehavior":"silent"}"#,
        );

        let posted = service.posted(1).expect("notification posted");
        assert_eq!(posted.channel_id, CHANNEL_ID_SILENT);
        assert_eq!(posted.text, "hello");
    }

    #[test]
    fn missing_behavior_defaults_to_sound_and_vibrate() {
        let (service, receiver) = setup();
        receiver.on_receive(r#"{"alarmId":3,"alarmMessage":"hello"}"#);

        let posted = service.posted(3).expect("notification posted");
        assert_eq!(posted.channel_id, CHANNEL_ID_VIBRATE_AND_SOUND);
    }

    #[test]
    fn empty_message_uses_fallback() {
        let (service, receiver) = setup();
        receiver.on_receive(r#"{"alarmId":1}"#);

        let posted = service.posted(1).expect("notification posted");
        assert_eq!(posted.text, "Time for your check-in!");
    }

    #[test]
    fn garbage_payload_posts_nothing() {
        let (service, receiver) = setup();
        receiver.on_receive("{not json");
        assert_eq!(service.active_count(), 0);
    }
}
