//! Host command passthrough (`` `cmd` ``).

use std::process::{Command, Output};

use conduit_types::error::{ConduitError, Result};

/// Run `command_line` through the host shell and return its stdout.
///
/// One trailing newline (`\n` or `\r\n`) is removed from the output. A
/// process that cannot be spawned, or that exits non-zero, becomes
/// [`ConduitError::Passthrough`] carrying its stderr.
///
/// Blocks until the process exits. There is no timeout or cancellation;
/// a hung host command hangs the caller.
pub fn run_host_command(command_line: &str) -> Result<String> {
    log::debug!("passthrough: {command_line}");
    let output = shell(command_line)
        .output()
        .map_err(|e| ConduitError::Passthrough(format!("{command_line}: {e}")))?;
    collect_output(command_line, output)
}

#[cfg(unix)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

fn collect_output(command_line: &str, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let status = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        return Err(ConduitError::Passthrough(if stderr.is_empty() {
            format!("{command_line}: {status}")
        } else {
            format!("{command_line}: {status}: {stderr}")
        }));
    }
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    strip_trailing_newline(&mut text);
    Ok(text)
}

fn strip_trailing_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_exactly_one_newline() {
        let mut s = String::from("hi\n\n");
        strip_trailing_newline(&mut s);
        assert_eq!(s, "hi\n");

        let mut s = String::from("hi\r\n");
        strip_trailing_newline(&mut s);
        assert_eq!(s, "hi");

        let mut s = String::from("hi");
        strip_trailing_newline(&mut s);
        assert_eq!(s, "hi");
    }

    #[cfg(unix)]
    #[test]
    fn echo_returns_stdout() {
        assert_eq!(run_host_command("echo hi").unwrap(), "hi");
    }

    #[cfg(unix)]
    #[test]
    fn multiline_output_keeps_inner_newlines() {
        assert_eq!(run_host_command("printf 'a\\nb\\n'").unwrap(), "a\nb");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_failure_with_stderr() {
        let err = run_host_command("echo boom >&2; exit 3").unwrap_err();
        match err {
            ConduitError::Passthrough(msg) => {
                assert!(msg.contains("exit code 3"));
                assert!(msg.contains("boom"));
            },
            other => panic!("expected Passthrough, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn missing_program_is_failure() {
        let err = run_host_command("definitely-not-a-real-program-xyz").unwrap_err();
        assert!(matches!(err, ConduitError::Passthrough(_)));
    }
}
