//! External command execution.
//!
//! Every call blocks until the child exits. There is no timeout and no
//! retry: a hung command hangs the calling lifecycle step.

use std::process::{Command, Stdio};

use crate::error::{CommandError, Result, RouterError};

/// Init script that controls dnsmasq on both supported platforms.
pub const DNSMASQ_INIT: &str = "/etc/init.d/dnsmasq";

/// Runs a program with arguments and returns its stdout.
///
/// The seam between adapters and the host. [`SystemRunner`] spawns real
/// processes; tests substitute a recorder.
pub trait CommandRunner {
    /// Runs `program` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the process cannot be started and
    /// [`CommandError::Exit`] if it exits unsuccessfully.
    fn run(&self, program: &str, args: &[&str]) -> std::result::Result<String, CommandError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str]) -> std::result::Result<String, CommandError> {
        (**self).run(program, args)
    }
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::result::Result<String, CommandError> {
        tracing::debug!(program, ?args, "Executing command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(CommandError::Spawn)?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(
            program,
            ?args,
            code = ?output.status.code(),
            stderr = %stderr,
            "Command failed"
        );
        Err(CommandError::Exit {
            code: output.status.code(),
            stderr,
        })
    }
}

/// Restarts dnsmasq through its init script, optionally under `sudo`.
///
/// # Errors
///
/// Returns [`RouterError::Command`] with op `dnsmasq restart`.
pub fn restart_dnsmasq(runner: &impl CommandRunner, elevate: bool) -> Result<()> {
    let result = if elevate {
        runner.run("sudo", &[DNSMASQ_INIT, "restart"])
    } else {
        runner.run(DNSMASQ_INIT, &["restart"])
    };
    result.map_err(|source| RouterError::Command {
        op: "dnsmasq restart".into(),
        source,
    })?;
    tracing::info!(elevate, "Restarted dnsmasq");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fake::FakeRunner;
    use super::*;

    #[test]
    fn system_runner_captures_stdout() {
        let out = SystemRunner.run("sh", &["-c", "echo hello"]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn system_runner_reports_exit_code() {
        let err = SystemRunner
            .run("sh", &["-c", "echo oops >&2; exit 3"])
            .unwrap_err();
        match err {
            CommandError::Exit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            CommandError::Spawn(e) => panic!("unexpected spawn error: {e}"),
        }
    }

    #[test]
    fn system_runner_reports_launch_failure() {
        let err = SystemRunner
            .run("/nonexistent/dnsmasq-shim-test", &[])
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn(_)));
    }

    #[test]
    fn restart_plain_and_elevated() {
        let runner = FakeRunner::default();
        restart_dnsmasq(&runner, false).unwrap();
        restart_dnsmasq(&runner, true).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "/etc/init.d/dnsmasq restart",
                "sudo /etc/init.d/dnsmasq restart"
            ]
        );
    }

    #[test]
    fn restart_failure_names_operation() {
        let runner = FakeRunner::default();
        runner.fail("/etc/init.d/dnsmasq restart");
        let err = restart_dnsmasq(&runner, false).unwrap_err();
        assert!(err.to_string().starts_with("dnsmasq restart: "));
    }
}
