//! checkin: command-line client for the check-in daemon.
//!
//! Schedules and cancels the check-in alarm, inspects posted notifications,
//! and plays the part of the prompt UI by submitting a decision.
//!
//! ## Subcommands
//!
//! - `schedule` / `cancel`: the two boundary calls the UI layer makes
//! - `health`, `notifications`, `events`: inspect daemon state
//! - `answer`, `decline`, `snooze`: resolve the posted alarm
//! - `config`: show the effective configuration, or write a default file

mod daemon_client;
mod logging;

use std::path::Path;

use checkin_core::{get_config_path, load_config, load_config_from, save_config_to, CheckinConfig};
use checkin_protocol::{AnswerData, Method, QuestionnaireFinished};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "checkin")]
#[command(about = "Check-in alarm client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule the check-in alarm
    Schedule {
        /// Absolute trigger time (RFC 3339, e.g. 2026-10-19T07:30:00+02:00)
        #[arg(long, conflicts_with = "in_secs")]
        at: Option<String>,

        /// Trigger this many seconds from now
        #[arg(long = "in", value_name = "SECONDS")]
        in_secs: Option<i64>,

        /// VibrateAndSound, Vibrate or Silent
        #[arg(long)]
        behavior: Option<String>,
    },

    /// Cancel the pending check-in alarm
    Cancel,

    /// Show daemon health
    Health,

    /// List posted alarm notifications
    Notifications,

    /// Drain messages sent to the UI runtime
    Events,

    /// Answer the check-in questionnaire
    Answer {
        /// How are you feeling? (1-3)
        feeling: i32,

        /// How did you sleep? (1-3)
        sleep_quality: i32,

        /// Optional free text
        #[arg(long, default_value = "")]
        info: String,

        /// Defaults to the configured alarm id
        #[arg(long)]
        alarm_id: Option<i32>,
    },

    /// Decline the check-in
    Decline {
        /// Defaults to the configured alarm id
        #[arg(long)]
        alarm_id: Option<i32>,
    },

    /// Snooze the check-in
    Snooze {
        /// Defaults to the configured alarm id
        #[arg(long)]
        alarm_id: Option<i32>,
    },

    /// Show the effective configuration, or write a default file
    Config {
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(value) => {
            if !value.is_null() {
                match serde_json::to_string_pretty(&value) {
                    Ok(text) => println!("{}", text),
                    Err(_) => println!("{}", value),
                }
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "checkin command failed");
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<Value, String> {
    match command {
        Commands::Schedule {
            at,
            in_secs,
            behavior,
        } => {
            let mut params = json!({});
            if let Some(trigger) = resolve_trigger(at.as_deref(), in_secs, Utc::now())? {
                params["triggerTime"] = json!(trigger);
            }
            if let Some(behavior) = behavior {
                params["behavior"] = json!(behavior);
            }
            daemon_client::call(Method::ScheduleAlarm, Some(params))
        }
        Commands::Cancel => daemon_client::call(Method::CancelAlarm, None),
        Commands::Health => daemon_client::call(Method::GetHealth, None),
        Commands::Notifications => daemon_client::call(Method::ListNotifications, None),
        Commands::Events => daemon_client::call(Method::PollEvents, None),
        Commands::Answer {
            feeling,
            sleep_quality,
            info,
            alarm_id,
        } => submit(
            resolve_alarm_id(alarm_id, &configured()),
            QuestionnaireFinished::Answered {
                data: AnswerData {
                    feeling,
                    sleep_quality,
                    additional_info: info,
                },
            },
        ),
        Commands::Decline { alarm_id } => submit(
            resolve_alarm_id(alarm_id, &configured()),
            QuestionnaireFinished::Declined,
        ),
        Commands::Snooze { alarm_id } => submit(
            resolve_alarm_id(alarm_id, &configured()),
            QuestionnaireFinished::Snoozed,
        ),
        Commands::Config { init } => {
            let path = get_config_path().ok_or_else(|| "Home directory not found".to_string())?;
            let config = if init {
                init_config(&path)?
            } else {
                load_config_from(&path).map_err(|err| err.to_string())?
            };
            Ok(json!({ "path": path.display().to_string(), "config": config }))
        }
    }
}

/// Loaded configuration, or defaults when the file is unreadable.
fn configured() -> CheckinConfig {
    load_config().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Config unusable, using defaults");
        CheckinConfig::default()
    })
}

fn resolve_alarm_id(explicit: Option<i32>, config: &CheckinConfig) -> i32 {
    explicit.unwrap_or(config.alarm_id)
}

/// Writes the default configuration to `path`. An existing file is left alone.
fn init_config(path: &Path) -> Result<CheckinConfig, String> {
    if path.exists() {
        return Err(format!("{} already exists", path.display()));
    }
    let config = CheckinConfig::default();
    save_config_to(path, &config).map_err(|err| err.to_string())?;
    tracing::info!(path = %path.display(), "Wrote default config");
    Ok(config)
}

fn submit(alarm_id: i32, result: QuestionnaireFinished) -> Result<Value, String> {
    let result =
        serde_json::to_value(result).map_err(|err| format!("Failed to encode decision: {}", err))?;
    daemon_client::call(
        Method::SubmitDecision,
        Some(json!({ "alarmId": alarm_id, "result": result })),
    )
}

/// Epoch millis for `--at` or `--in`. Neither given leaves the trigger out so
/// the daemon reports the missing argument.
fn resolve_trigger(
    at: Option<&str>,
    in_secs: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Option<i64>, String> {
    match (at, in_secs) {
        (Some(at), _) => DateTime::parse_from_rfc3339(at)
            .map(|dt| Some(dt.timestamp_millis()))
            .map_err(|err| format!("Invalid --at time {:?}: {}", at, err)),
        (None, Some(secs)) => secs
            .checked_mul(1000)
            .and_then(|millis| now.timestamp_millis().checked_add(millis))
            .map(Some)
            .ok_or_else(|| format!("--in {} is out of range", secs)),
        (None, None) => Ok(None),
    }
}
