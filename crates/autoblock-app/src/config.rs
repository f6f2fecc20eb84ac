//! JSON configuration loading and validation.
//!
//! The on-disk schema uses kebab-case keys and flat hour/minute integers:
//!
//! ```json
//! {
//!     "username": "alice",
//!     "selfcontrol-path": "/Applications/SelfControl.app",
//!     "host-blacklist": ["example.com"],
//!     "block-schedules": [
//!         {
//!             "weekday": 4,
//!             "start-hour": 22,
//!             "start-minute": 0,
//!             "end-hour": 5,
//!             "end-minute": 0
//!         }
//!     ]
//! }
//! ```
//!
//! A schedule entry may override `block-as-whitelist` and `host-blacklist`;
//! leaving them out falls through to the global defaults. `weekday` is an ISO
//! weekday (Monday = 1 .. Sunday = 7); leaving it out means every day.

use std::path::{Path, PathBuf};

use autoblock_core::{BlockPolicy, Schedule, TimeOfDay};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::system;

/// Sample configuration written by the `config` subcommand on first use.
pub const SAMPLE_CONFIG: &str = r#"{
    "username": "your-macos-username",
    "selfcontrol-path": "/Applications/SelfControl.app",
    "host-blacklist": [
        "twitter.com",
        "reddit.com",
        "youtube.com"
    ],
    "block-schedules": [
        {
            "weekday": 1,
            "start-hour": 9,
            "start-minute": 0,
            "end-hour": 17,
            "end-minute": 30
        },
        {
            "start-hour": 22,
            "start-minute": 0,
            "end-hour": 6,
            "end-minute": 0
        }
    ]
}
"#;

/// Errors from loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (including missing required hour/minute fields).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No username in the config.
    #[error("no username specified in config")]
    MissingUsername,

    /// Username does not exist on this machine.
    #[error(
        "username '{0}' unknown; use your OS username instead (the `whoami` command prints it)"
    )]
    UnknownUsername(String),

    /// No selfcontrol-path in the config.
    #[error("the setting 'selfcontrol-path' is required and must point to SelfControl")]
    MissingSelfControlPath,

    /// selfcontrol-path does not exist.
    #[error(
        "'selfcontrol-path' does not point to SelfControl ({0}); use an absolute path \
         including the .app extension, e.g. /Applications/SelfControl.app"
    )]
    BadSelfControlPath(PathBuf),

    /// No block-schedules in the config.
    #[error("the setting 'block-schedules' is required")]
    MissingSchedules,

    /// block-schedules is empty.
    #[error("you need at least one schedule in 'block-schedules'")]
    EmptySchedules,

    /// A schedule entry has an out-of-range field.
    #[error("invalid schedule entry {index}: {reason}")]
    InvalidSchedule { index: usize, reason: String },

    /// Account lookup failed.
    #[error(transparent)]
    System(#[from] system::SystemError),
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    username: Option<String>,
    selfcontrol_path: Option<PathBuf>,
    block_schedules: Option<Vec<RawSchedule>>,
    host_blacklist: Option<Vec<String>>,
    legacy_mode: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSchedule {
    weekday: Option<u8>,
    start_hour: u8,
    start_minute: u8,
    end_hour: u8,
    end_minute: u8,
    block_as_whitelist: Option<bool>,
    host_blacklist: Option<Vec<String>>,
}

impl RawSchedule {
    fn into_schedule(self, index: usize) -> Result<Schedule> {
        let invalid = |reason: String| ConfigError::InvalidSchedule { index, reason };

        if let Some(day) = self.weekday {
            if !(1..=7).contains(&day) {
                return Err(invalid(format!("weekday {day} out of range 1-7")));
            }
        }
        for (name, hour) in [("start-hour", self.start_hour), ("end-hour", self.end_hour)] {
            if hour > 23 {
                return Err(invalid(format!("{name} {hour} out of range 0-23")));
            }
        }
        for (name, minute) in [
            ("start-minute", self.start_minute),
            ("end-minute", self.end_minute),
        ] {
            if minute > 59 {
                return Err(invalid(format!("{name} {minute} out of range 0-59")));
            }
        }

        Ok(Schedule {
            weekday: self.weekday,
            start_time: TimeOfDay::new(self.start_hour, self.start_minute),
            end_time: TimeOfDay::new(self.end_hour, self.end_minute),
            block_as_whitelist: self.block_as_whitelist,
            host_blacklist: self.host_blacklist,
        })
    }
}

/// The loaded, validated configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OS account whose SelfControl preferences are written.
    pub username: String,
    /// Path to the SelfControl application bundle.
    pub selfcontrol_path: PathBuf,
    /// The blocking policy handed to the core engine.
    pub policy: BlockPolicy,
    /// Whether to write BlockStartedDate for old SelfControl versions.
    pub legacy_mode: bool,
}

impl AppConfig {
    /// Loads and validates the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let raw: RawConfig = serde_json::from_str(&text)?;

        let username = raw.username.ok_or(ConfigError::MissingUsername)?;
        let selfcontrol_path = raw
            .selfcontrol_path
            .ok_or(ConfigError::MissingSelfControlPath)?;
        if !selfcontrol_path.exists() {
            return Err(ConfigError::BadSelfControlPath(selfcontrol_path));
        }

        let raw_schedules = raw.block_schedules.ok_or(ConfigError::MissingSchedules)?;
        if raw_schedules.is_empty() {
            return Err(ConfigError::EmptySchedules);
        }
        let schedules = raw_schedules
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_schedule(index))
            .collect::<Result<Vec<_>>>()?;

        if raw.host_blacklist.is_none() {
            tracing::warn!(
                "no global 'host-blacklist' configured; SelfControl will keep using \
                 its own blacklist, which is not recommended"
            );
        }

        let mut policy = BlockPolicy::new(schedules);
        policy.host_blacklist = raw.host_blacklist;

        Ok(Self {
            username,
            selfcontrol_path,
            policy,
            legacy_mode: raw.legacy_mode.unwrap_or(false),
        })
    }

    /// Checks that the configured username exists on this machine.
    ///
    /// Separate from [`AppConfig::load`] because it queries the OS directory
    /// service; parsing stays testable without one.
    pub fn verify_username(&self) -> Result<()> {
        if !system::os_usernames()?.contains(&self.username) {
            return Err(ConfigError::UnknownUsername(self.username.clone()));
        }
        Ok(())
    }
}

/// Returns the default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "autoblock", "autoblock")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Writes a config into a temp dir, with `selfcontrol-path` pointing at a
    /// file that actually exists there.
    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let app_path = dir.path().join("SelfControl.app");
        fs::create_dir(&app_path).unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            body.replace("SELFCONTROL_PATH", app_path.to_str().unwrap()),
        )
        .unwrap();
        (dir, config_path)
    }

    const VALID: &str = r#"{
        "username": "alice",
        "selfcontrol-path": "SELFCONTROL_PATH",
        "host-blacklist": ["example.com"],
        "block-schedules": [
            {"weekday": 4, "start-hour": 22, "start-minute": 0, "end-hour": 5, "end-minute": 0},
            {"start-hour": 9, "start-minute": 30, "end-hour": 17, "end-minute": 0,
             "block-as-whitelist": true, "host-blacklist": []}
        ]
    }"#;

    // ==================== Loading Tests ====================

    #[test]
    fn loads_valid_config() {
        let (_dir, path) = write_config(VALID);
        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.username, "alice");
        assert!(!config.legacy_mode);
        assert_eq!(
            config.policy.host_blacklist,
            Some(vec!["example.com".to_string()])
        );

        let schedules = &config.policy.block_schedules;
        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules[0].weekday, Some(4));
        assert_eq!(schedules[0].start_time, TimeOfDay::new(22, 0));
        assert_eq!(schedules[0].end_time, TimeOfDay::new(5, 0));
        assert_eq!(schedules[0].block_as_whitelist, None);
        assert_eq!(schedules[0].host_blacklist, None);

        assert_eq!(schedules[1].weekday, None);
        assert_eq!(schedules[1].block_as_whitelist, Some(true));
        // Present-but-empty stays empty; it must not fall through.
        assert_eq!(schedules[1].host_blacklist, Some(vec![]));
    }

    #[test]
    fn legacy_mode_is_read() {
        let (_dir, path) = write_config(
            r#"{
                "username": "alice",
                "selfcontrol-path": "SELFCONTROL_PATH",
                "legacy-mode": true,
                "block-schedules": [
                    {"start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 0}
                ]
            }"#,
        );
        let config = AppConfig::load(&path).unwrap();
        assert!(config.legacy_mode);
        assert_eq!(config.policy.host_blacklist, None);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn missing_username() {
        let (_dir, path) = write_config(
            r#"{"selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": [{"start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::MissingUsername)
        ));
    }

    #[test]
    fn missing_selfcontrol_path() {
        let (_dir, path) = write_config(
            r#"{"username": "alice",
                "block-schedules": [{"start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::MissingSelfControlPath)
        ));
    }

    #[test]
    fn nonexistent_selfcontrol_path() {
        let (_dir, path) = write_config(
            r#"{"username": "alice",
                "selfcontrol-path": "/autoblock-no-such-path/SelfControl.app",
                "block-schedules": [{"start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::BadSelfControlPath(_))
        ));
    }

    #[test]
    fn missing_schedules() {
        let (_dir, path) =
            write_config(r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH"}"#);
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::MissingSchedules)
        ));
    }

    #[test]
    fn empty_schedules() {
        let (_dir, path) = write_config(
            r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": []}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::EmptySchedules)
        ));
    }

    #[test]
    fn weekday_out_of_range() {
        let (_dir, path) = write_config(
            r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": [{"weekday": 8, "start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidSchedule { index: 0, .. })
        ));
    }

    #[test]
    fn hour_out_of_range() {
        let (_dir, path) = write_config(
            r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": [{"start-hour": 24, "start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidSchedule { index: 0, .. })
        ));
    }

    #[test]
    fn minute_out_of_range() {
        let (_dir, path) = write_config(
            r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": [{"start-hour": 9, "start-minute": 0, "end-hour": 17, "end-minute": 60}]}"#,
        );
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidSchedule { index: 0, .. })
        ));
    }

    #[test]
    fn missing_hour_field_is_a_json_error() {
        let (_dir, path) = write_config(
            r#"{"username": "alice", "selfcontrol-path": "SELFCONTROL_PATH",
                "block-schedules": [{"start-minute": 0, "end-hour": 17, "end-minute": 0}]}"#,
        );
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Io(_))));
    }

    // ==================== Sample Config Tests ====================

    #[test]
    fn sample_config_matches_the_schema() {
        let raw: RawConfig = serde_json::from_str(SAMPLE_CONFIG).unwrap();
        assert!(raw.username.is_some());
        assert!(raw.selfcontrol_path.is_some());
        let schedules = raw.block_schedules.unwrap();
        assert_eq!(schedules.len(), 2);
        for (index, schedule) in schedules.into_iter().enumerate() {
            schedule.into_schedule(index).unwrap();
        }
    }
}
