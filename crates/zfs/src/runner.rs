//! Blocking command execution

use crate::error::ZfsError;
use std::process::Command;
use tracing::debug;

/// Run `argv` to completion and return its stdout
///
/// A non-zero exit becomes `CommandFailed` carrying stderr (or stdout when
/// stderr is empty).
pub fn run(what: &'static str, argv: &[String]) -> Result<Vec<u8>, ZfsError> {
    let (program, args) = argv.split_first().ok_or(ZfsError::EmptyCommand(what))?;
    let command = argv.join(" ");
    debug!("Executing command: {:?}", argv);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ZfsError::Spawn {
            command: command.clone(),
            source,
        })?;

    debug!(exit_code = ?output.status.code(), "Command finished");
    if !output.stdout.is_empty() {
        debug!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    }
    if !output.stderr.is_empty() {
        debug!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(ZfsError::CommandFailed {
            command,
            code: output.status.code(),
            output: detail,
        });
    }

    Ok(output.stdout)
}
