//! Process privilege and user account checks.

use std::process::Command;

use thiserror::Error;

/// Errors from privilege and account lookups.
#[derive(Debug, Error)]
pub enum SystemError {
    /// IO error spawning a system utility.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A system utility exited with a failure status.
    #[error("`{command}` failed with {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
    },

    /// A system utility printed something unparseable.
    #[error("unexpected output from `{command}`: {output}")]
    UnexpectedOutput { command: String, output: String },

    /// The process is not running as root.
    #[error("elevated rights required; re-run with sudo")]
    NotRoot,
}

/// Result type for system operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// Returns the effective uid of this process.
pub fn effective_uid() -> Result<u32> {
    run_and_parse(Command::new("id").arg("-u"), "id -u")
}

/// Returns an error unless the process runs as root.
///
/// Writing under `/Library/LaunchDaemons` and another user's preference
/// domain both need it.
pub fn ensure_root() -> Result<()> {
    if effective_uid()? != 0 {
        return Err(SystemError::NotRoot);
    }
    Ok(())
}

/// Returns the uid of the given user.
pub fn user_id(username: &str) -> Result<u32> {
    run_and_parse(
        Command::new("id").args(["-u", username]),
        &format!("id -u {username}"),
    )
}

/// Lists the OS account names, via the macOS directory service.
pub fn os_usernames() -> Result<Vec<String>> {
    let command = "dscl . list /users";
    let output = Command::new("dscl").args([".", "list", "/users"]).output()?;
    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            command: command.to_string(),
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn run_and_parse(command: &mut Command, rendered: &str) -> Result<u32> {
    let output = command.output()?;
    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            command: rendered.to_string(),
            status: output.status,
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse()
        .map_err(|_| SystemError::UnexpectedOutput {
            command: rendered.to_string(),
            output: stdout.trim().to_string(),
        })
}
