//! Interface to the SelfControl application.
//!
//! SelfControl keeps its session state in the `org.eyebeam.SelfControl`
//! defaults domain of the blocked user. The store writes that domain as the
//! target user (`sudo -u <user> defaults …`), and the launcher starts the
//! app's helper binary with the user's uid, the same way SelfControl's own
//! scheduling UI does.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Local;
use thiserror::Error;

use crate::system;

/// SelfControl's preference domain.
pub const BUNDLE_ID: &str = "org.eyebeam.SelfControl";

/// SelfControl writes `distantFuture` into BlockStartedDate when no session
/// is running.
const DISTANT_FUTURE_DATE: &str = "4001-01-01";

/// Errors from preference writes or launching SelfControl.
#[derive(Debug, Error)]
pub enum SelfControlError {
    /// IO error spawning a command.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `defaults write` exited with a failure status.
    #[error("failed to write preference {key}: {status}")]
    WriteFailed {
        key: &'static str,
        status: std::process::ExitStatus,
    },

    /// The SelfControl helper binary exited with a failure status.
    #[error("failed to launch SelfControl at {path}: {status}")]
    LaunchFailed {
        path: PathBuf,
        status: std::process::ExitStatus,
    },

    /// Uid lookup failed.
    #[error(transparent)]
    System(#[from] system::SystemError),
}

/// Result type for SelfControl operations.
pub type Result<T> = std::result::Result<T, SelfControlError>;

/// Writes SelfControl's persisted preferences for one user.
pub struct PreferenceStore {
    username: String,
}

impl PreferenceStore {
    /// Creates a store scoped to the given user's preference domain.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Returns true if a blocking session is already in progress.
    ///
    /// True when BlockStartedDate is set to anything other than the
    /// distant-future sentinel. A missing key, an unreadable domain, or a
    /// failed read all count as "not running".
    pub fn is_block_running(&self) -> bool {
        let output = Command::new("sudo")
            .args(["-n", "-u", &self.username, "defaults", "read", BUNDLE_ID])
            .arg("BlockStartedDate")
            .output();
        match output {
            Ok(output) if output.status.success() => {
                !String::from_utf8_lossy(&output.stdout).contains(DISTANT_FUTURE_DATE)
            }
            _ => false,
        }
    }

    /// Sets BlockDuration, the session length in minutes.
    pub fn set_block_duration(&self, minutes: u32) -> Result<()> {
        let minutes = minutes.to_string();
        self.write("BlockDuration", ["-int", minutes.as_str()])
    }

    /// Sets BlockAsWhitelist (stored as 1/0).
    pub fn set_block_as_whitelist(&self, enabled: bool) -> Result<()> {
        self.write(
            "BlockAsWhitelist",
            ["-int", if enabled { "1" } else { "0" }],
        )
    }

    /// Sets HostBlacklist to the given host array.
    pub fn set_host_blacklist(&self, hosts: &[String]) -> Result<()> {
        let mut args = vec!["-array"];
        args.extend(hosts.iter().map(String::as_str));
        self.write("HostBlacklist", args)
    }

    /// Sets BlockStartedDate to the current time.
    ///
    /// Only needed in legacy mode; current SelfControl versions write this
    /// themselves when the block starts.
    pub fn set_block_started_now(&self) -> Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string();
        self.write("BlockStartedDate", ["-date", now.as_str()])
    }

    fn write<'a, I>(&self, key: &'static str, value_args: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let status = Command::new("sudo")
            .args(["-n", "-u", &self.username, "defaults", "write", BUNDLE_ID, key])
            .args(value_args)
            .status()?;
        if !status.success() {
            return Err(SelfControlError::WriteFailed { key, status });
        }
        tracing::debug!(key, user = %self.username, "wrote SelfControl preference");
        Ok(())
    }
}

/// Launches SelfControl's helper binary to start the block for the user.
pub fn start_block(selfcontrol_path: &Path, username: &str) -> Result<()> {
    let uid = system::user_id(username)?;
    let binary = selfcontrol_path.join("Contents/MacOS/org.eyebeam.SelfControl");
    let status = Command::new(&binary)
        .arg(uid.to_string())
        .arg("--install")
        .status()?;
    if !status.success() {
        return Err(SelfControlError::LaunchFailed {
            path: binary,
            status,
        });
    }
    Ok(())
}
