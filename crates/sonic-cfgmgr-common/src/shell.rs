//! `ip`/`sysctl` command execution
//!
//! Link mutations are issued as command lines run through `/bin/sh -c`.
//! Every token that comes from configuration goes through [`shellquote`]
//! first.

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::error::{CfgMgrError, CfgMgrResult};

pub const IP_CMD: &str = "/sbin/ip";

pub const SYSCTL_CMD: &str = "/sbin/sysctl";

/// `$`, backquote, `"`, `\` and newline keep their meaning inside double quotes.
static DQUOTE_SPECIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Wraps `s` in double quotes, escaping what the shell would expand.
///
/// ```
/// use sonic_cfgmgr_common::shell::shellquote;
///
/// assert_eq!(shellquote("tun0"), "\"tun0\"");
/// assert_eq!(shellquote("uplink $site"), "\"uplink \\$site\"");
/// ```
pub fn shellquote(s: &str) -> String {
    format!("\"{}\"", DQUOTE_SPECIAL.replace_all(s, r"\$1"))
}

/// Captured output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }

    /// What to report when the command failed: stderr if any, else stdout.
    pub fn error_text(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Runs `cmd` and captures its output. A non-zero exit is not an error here.
pub async fn exec(cmd: &str) -> CfgMgrResult<CommandOutput> {
    debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| CfgMgrError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let output = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
    trace!(command = %cmd, code = ?output.code, "Command finished");
    Ok(output)
}

/// Runs `cmd` and returns its stdout; a non-zero exit becomes
/// [`CfgMgrError::ShellCommandFailed`].
pub async fn exec_checked(cmd: &str) -> CfgMgrResult<String> {
    let output = exec(cmd).await?;
    if output.succeeded() {
        return Ok(output.stdout);
    }

    warn!(command = %cmd, code = ?output.code, stderr = %output.stderr, "Command failed");
    Err(CfgMgrError::ShellCommandFailed {
        command: cmd.to_string(),
        exit_code: output.code.unwrap_or(-1),
        output: output.error_text().to_string(),
    })
}

/// True if `cmd` could be run and exited with 0.
pub async fn succeeds(cmd: &str) -> bool {
    matches!(exec(cmd).await, Ok(output) if output.succeeded())
}
