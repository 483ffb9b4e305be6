//! Notification channel registry.
//!
//! One channel per behavior class. Hosts do not let a channel's sound or
//! vibration policy change after creation, so this table is fixed: a change in
//! behavior semantics needs a new channel id, never an edit to an existing row.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CheckinError, Result};
use crate::notifications::NotificationService;
use crate::types::BehaviorTag;

pub const CHANNEL_ID_VIBRATE_AND_SOUND: &str = "alarm_channel_vibrate_sound";
pub const CHANNEL_ID_VIBRATE_ONLY: &str = "alarm_channel_vibrate_only";
pub const CHANNEL_ID_SILENT: &str = "alarm_channel_silent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum Importance {
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum LockscreenVisibility {
    Private,
    Public,
}

/// Static row of the channel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub behavior: BehaviorTag,
    pub vibration: bool,
    pub sound: bool,
}

// Importance stays High on every row (including Silent) so the alarm still
// qualifies for heads-up and full-screen delivery.
pub const CHANNELS: [ChannelDefinition; 3] = [
    ChannelDefinition {
        id: CHANNEL_ID_VIBRATE_AND_SOUND,
        name: "Alarms (Vibrate and Sound)",
        description: "Channel for alarms with sound and vibration.",
        behavior: BehaviorTag::SoundAndVibrate,
        vibration: true,
        sound: true,
    },
    ChannelDefinition {
        id: CHANNEL_ID_VIBRATE_ONLY,
        name: "Alarms (Vibrate Only)",
        description: "Channel for alarms with vibration only.",
        behavior: BehaviorTag::VibrateOnly,
        vibration: true,
        sound: false,
    },
    ChannelDefinition {
        id: CHANNEL_ID_SILENT,
        name: "Alarms (Silent)",
        description: "Channel for silent alarms.",
        behavior: BehaviorTag::Silent,
        vibration: false,
        sound: false,
    },
];

/// Channel description handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub bypass_dnd: bool,
    pub lockscreen_visibility: LockscreenVisibility,
    pub vibration: bool,
    pub sound: bool,
}

impl From<&ChannelDefinition> for ChannelSpec {
    fn from(def: &ChannelDefinition) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            importance: Importance::High,
            bypass_dnd: true,
            lockscreen_visibility: LockscreenVisibility::Public,
            vibration: def.vibration,
            sound: def.sound,
        }
    }
}

/// Looks up the channel row for a behavior.
pub fn channel_for(behavior: BehaviorTag) -> &'static ChannelDefinition {
    match behavior {
        BehaviorTag::SoundAndVibrate => &CHANNELS[0],
        BehaviorTag::VibrateOnly => &CHANNELS[1],
        BehaviorTag::Silent => &CHANNELS[2],
    }
}

/// Returns the full channel table as host specs.
#[uniffi::export]
pub fn channel_specs() -> Vec<ChannelSpec> {
    CHANNELS.iter().map(ChannelSpec::from).collect()
}

/// Declares all three channels with the host.
///
/// Safe to repeat: hosts treat re-creating an existing id as a no-op.
pub fn register_channels(service: &dyn NotificationService) -> Result<()> {
    for def in &CHANNELS {
        service
            .create_channel(ChannelSpec::from(def))
            .map_err(|err| CheckinError::host("create_channel", err))?;
        debug!(channel_id = def.id, "Notification channel declared");
    }
    info!(count = CHANNELS.len(), "Notification channels registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNotificationService;
    use std::collections::HashSet;

    #[test]
    fn channel_ids_are_distinct() {
        let ids: HashSet<_> = CHANNELS.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), CHANNELS.len());
    }

    #[test]
    fn every_behavior_has_its_own_channel() {
        for tag in BehaviorTag::ALL {
            assert_eq!(channel_for(tag).behavior, tag);
        }
    }

    #[test]
    fn every_channel_is_urgent_and_public() {
        for spec in channel_specs() {
            assert_eq!(spec.importance, Importance::High);
            assert!(spec.bypass_dnd);
            assert_eq!(spec.lockscreen_visibility, LockscreenVisibility::Public);
        }
    }

    #[test]
    fn silent_channel_has_no_sound_or_vibration() {
        let silent = channel_for(BehaviorTag::Silent);
        assert!(!silent.sound);
        assert!(!silent.vibration);

        let vibrate = channel_for(BehaviorTag::VibrateOnly);
        assert!(vibrate.vibration);
        assert!(!vibrate.sound);
    }

    #[test]
    fn register_channels_is_idempotent() {
        let service = FakeNotificationService::default();
        register_channels(&service).expect("first registration");
        register_channels(&service).expect("second registration");

        assert_eq!(service.channel_ids().len(), 3);
        assert_eq!(service.create_channel_calls(), 6);
    }

    #[test]
    fn register_channels_surfaces_host_failure() {
        let service = FakeNotificationService::default();
        service.fail_create_channel(true);
        let err = register_channels(&service).unwrap_err();
        assert!(matches!(err, CheckinError::Host { .. }));
    }
}
