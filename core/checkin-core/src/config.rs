//! Configuration loading.
//!
//! Handles paths and persistence for:
//! - Check-in configuration (`~/.checkin/config.toml`)
//! - The daemon socket and log directory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CheckinError, Result};
use crate::types::{AlarmRecord, BehaviorTag};

pub const CONFIG_ENV: &str = "CHECKIN_CONFIG";
pub const SOCKET_ENV: &str = "CHECKIN_DAEMON_SOCKET";

pub const DEFAULT_ENGINE_ID: &str = "checkin_engine";
pub const DEFAULT_METHOD_CHANNEL: &str = "checkin/alarm_manager";
pub const DEFAULT_ALARM_ID: i32 = 1;
pub const DEFAULT_ALARM_MESSAGE: &str = "Time for your check-in!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct CheckinConfig {
    /// Key of the shared UI runtime in the runtime cache.
    pub engine_id: String,
    pub method_channel: String,
    pub alarm_id: i32,
    pub alarm_message: String,
    pub default_behavior: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            method_channel: DEFAULT_METHOD_CHANNEL.to_string(),
            alarm_id: DEFAULT_ALARM_ID,
            alarm_message: DEFAULT_ALARM_MESSAGE.to_string(),
            default_behavior: BehaviorTag::default().as_wire().to_string(),
        }
    }
}

impl CheckinConfig {
    /// The alarm every `scheduleAlarm`/`cancelAlarm` call refers to.
    pub fn alarm_record(&self) -> AlarmRecord {
        AlarmRecord::new(self.alarm_id, self.alarm_message.clone())
    }

    pub fn default_behavior(&self) -> BehaviorTag {
        BehaviorTag::from_wire(&self.default_behavior)
    }
}

/// Returns the check-in directory (~/.checkin).
pub fn get_checkin_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".checkin"))
}

/// Returns the config path, honouring `CHECKIN_CONFIG`.
pub fn get_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| get_checkin_dir().map(|d| d.join("config.toml")))
}

/// Returns the daemon socket path, honouring `CHECKIN_DAEMON_SOCKET`.
pub fn get_socket_path() -> Option<PathBuf> {
    std::env::var_os(SOCKET_ENV)
        .map(PathBuf::from)
        .or_else(|| get_checkin_dir().map(|d| d.join("daemon.sock")))
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_checkin_dir().map(|d| d.join("logs"))
}

/// Loads the configuration, returning defaults if the file doesn't exist.
pub fn load_config() -> Result<CheckinConfig> {
    match get_config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(CheckinConfig::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<CheckinConfig> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(CheckinConfig::default()),
        Err(source) => {
            return Err(CheckinError::Io {
                context: "reading config".to_string(),
                source,
            })
        }
    };

    toml::from_str(&content).map_err(|err| CheckinError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Writes the configuration, creating the parent directory as needed.
pub fn save_config_to(path: &Path, config: &CheckinConfig) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|err| CheckinError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(|source| CheckinError::Io {
            context: "creating config directory".to_string(),
            source,
        })?;
    }
    fs_err::write(path, content).map_err(|source| CheckinError::Io {
        context: "writing config".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, CheckinConfig::default());
        assert_eq!(config.alarm_id, 1);
        assert_eq!(config.default_behavior(), BehaviorTag::SoundAndVibrate);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "alarm_id = 7\ndefault_behavior = \"Silent\"\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.alarm_id, 7);
        assert_eq!(config.default_behavior(), BehaviorTag::Silent);
        assert_eq!(config.engine_id, DEFAULT_ENGINE_ID);
        assert_eq!(config.alarm_record().message, DEFAULT_ALARM_MESSAGE);
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "alarm_id = \"one\"").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, CheckinError::ConfigMalformed { .. }));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let config = CheckinConfig {
            alarm_message: "Morning".to_string(),
            ..CheckinConfig::default()
        };

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }
}
