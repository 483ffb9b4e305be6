//! In-memory notification center for the desktop host.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use checkin_core::{ChannelSpec, CheckinFfiError, Notification, NotificationService};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedNotification {
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub sound: bool,
    pub vibration: bool,
}

#[derive(Default)]
struct CenterState {
    channels: BTreeMap<String, ChannelSpec>,
    active: BTreeMap<i32, Notification>,
}

#[derive(Default)]
pub struct NotificationCenter {
    state: Mutex<CenterState>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CenterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: i32) -> Option<Notification> {
        self.lock().active.get(&id).cloned()
    }

    /// Posted notifications with their channel's sound and vibration policy.
    pub fn snapshot(&self) -> Vec<PostedNotification> {
        let state = self.lock();
        state
            .active
            .iter()
            .map(|(id, notification)| {
                let channel = state.channels.get(&notification.channel_id);
                PostedNotification {
                    id: *id,
                    channel_id: notification.channel_id.clone(),
                    title: notification.title.clone(),
                    text: notification.text.clone(),
                    sound: channel.is_some_and(|c| c.sound),
                    vibration: channel.is_some_and(|c| c.vibration),
                }
            })
            .collect()
    }

    pub fn channel_count(&self) -> usize {
        self.lock().channels.len()
    }
}

impl NotificationService for NotificationCenter {
    fn create_channel(&self, spec: ChannelSpec) -> Result<(), CheckinFfiError> {
        // Channel attributes are fixed once created.
        self.lock().channels.entry(spec.id.clone()).or_insert(spec);
        Ok(())
    }

    fn notify(&self, id: i32, notification: Notification) -> Result<(), CheckinFfiError> {
        info!(id, channel_id = %notification.channel_id, text = %notification.text, "Notification posted");
        self.lock().active.insert(id, notification);
        Ok(())
    }

    fn cancel(&self, id: i32) -> Result<(), CheckinFfiError> {
        if self.lock().active.remove(&id).is_some() {
            info!(id, "Notification cancelled");
        }
        Ok(())
    }
}
