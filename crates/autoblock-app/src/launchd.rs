//! Launchd registration for the recurring schedule trigger.
//!
//! Renders a LaunchDaemon property list with one `StartCalendarInterval`
//! entry per weekly start event and (re)loads it through `launchctl`. Every
//! firing re-invokes this binary with the `run` subcommand, which evaluates
//! the schedule once.

use std::path::Path;
use std::process::Command;

use autoblock_core::StartEvent;
use thiserror::Error;

/// Label of the installed daemon.
pub const DAEMON_LABEL: &str = "com.autoblock.scheduler";

/// Where the daemon plist is written.
pub const DAEMON_PLIST_PATH: &str = "/Library/LaunchDaemons/com.autoblock.scheduler.plist";

/// Errors from installing or removing the daemon.
#[derive(Debug, Error)]
pub enum LaunchdError {
    /// IO error writing or removing the plist.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to get the path of this executable.
    #[error("failed to get executable path")]
    ExecutablePath,

    /// launchctl exited with a failure status.
    #[error("launchctl {action} failed with {status}")]
    Launchctl {
        action: &'static str,
        status: std::process::ExitStatus,
    },
}

/// Result type for launchd operations.
pub type Result<T> = std::result::Result<T, LaunchdError>;

fn render_interval(event: &StartEvent) -> String {
    format!(
        "        <dict>
            <key>Weekday</key>
            <integer>{}</integer>
            <key>Hour</key>
            <integer>{}</integer>
            <key>Minute</key>
            <integer>{}</integer>
        </dict>
",
        event.weekday, event.hour, event.minute
    )
}

/// Renders the daemon property list for the given program and start events.
pub fn render_plist(program: &Path, events: &[StartEvent]) -> String {
    let intervals: String = events.iter().map(render_interval).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
        <string>run</string>
    </array>
    <key>StartCalendarInterval</key>
    <array>
{intervals}    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
        label = DAEMON_LABEL,
        program = program.display(),
        intervals = intervals,
    )
}

/// Installs (or reinstalls) the daemon for the given start events.
pub fn install(events: &[StartEvent]) -> Result<()> {
    let program = std::env::current_exe().map_err(|_| LaunchdError::ExecutablePath)?;
    let plist = render_plist(&program, events);
    let path = Path::new(DAEMON_PLIST_PATH);

    if path.exists() {
        // Unload may fail when the job was never loaded; the stale file is
        // removed either way.
        let _ = Command::new("launchctl")
            .args(["unload", "-w", DAEMON_PLIST_PATH])
            .status();
        std::fs::remove_file(path)?;
        tracing::info!("removed previous daemon registration");
    }

    std::fs::write(path, plist)?;
    let status = Command::new("launchctl")
        .args(["load", "-w", DAEMON_PLIST_PATH])
        .status()?;
    if !status.success() {
        return Err(LaunchdError::Launchctl {
            action: "load",
            status,
        });
    }
    tracing::info!(
        label = DAEMON_LABEL,
        events = events.len(),
        "daemon installed"
    );
    Ok(())
}

/// Unloads and removes the daemon, if present.
pub fn uninstall() -> Result<()> {
    let path = Path::new(DAEMON_PLIST_PATH);
    if !path.exists() {
        return Ok(());
    }
    let _ = Command::new("launchctl")
        .args(["unload", "-w", DAEMON_PLIST_PATH])
        .status();
    std::fs::remove_file(path)?;
    tracing::info!(label = DAEMON_LABEL, "daemon removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn events() -> Vec<StartEvent> {
        vec![
            StartEvent {
                weekday: 4,
                hour: 22,
                minute: 0,
            },
            StartEvent {
                weekday: 5,
                hour: 9,
                minute: 30,
            },
        ]
    }

    // ==================== Rendering Tests ====================

    #[test]
    fn plist_contains_label_and_program() {
        let plist = render_plist(&PathBuf::from("/usr/local/bin/autoblock"), &events());

        assert!(plist.contains("<string>com.autoblock.scheduler</string>"));
        assert!(plist.contains("<string>/usr/local/bin/autoblock</string>"));
        assert!(plist.contains("<string>run</string>"));
        assert!(plist.contains("<key>RunAtLoad</key>"));
    }

    #[test]
    fn plist_has_one_interval_per_event() {
        let plist = render_plist(&PathBuf::from("/usr/local/bin/autoblock"), &events());
        assert_eq!(plist.matches("<key>Weekday</key>").count(), 2);
        assert_eq!(plist.matches("<key>Hour</key>").count(), 2);
        assert_eq!(plist.matches("<key>Minute</key>").count(), 2);
    }

    #[test]
    fn interval_carries_event_fields() {
        let rendered = render_interval(&StartEvent {
            weekday: 4,
            hour: 22,
            minute: 5,
        });
        assert!(rendered.contains("<key>Weekday</key>"));
        assert!(rendered.contains("<integer>4</integer>"));
        assert!(rendered.contains("<integer>22</integer>"));
        assert!(rendered.contains("<integer>5</integer>"));
    }

    #[test]
    fn no_events_renders_empty_array() {
        let plist = render_plist(&PathBuf::from("/usr/local/bin/autoblock"), &[]);
        assert_eq!(plist.matches("<key>Weekday</key>").count(), 0);
        assert!(plist.contains("<key>StartCalendarInterval</key>"));
    }
}
