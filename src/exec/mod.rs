//! Runs approved commands through the host shell.

use std::io;
use std::process::Command;

use crate::policy::SubstringPolicy;

/// Everything captured from one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub success: bool,
}

/// Why an execution produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("no command supplied")]
    NoCommand,
    #[error("{reason}")]
    Denied { reason: String },
    #[error("command failed: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("could not start shell: {0}")]
    Spawn(#[from] io::Error),
}

/// The process-spawning boundary.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and capture its output.
    fn run(&self, command: &str) -> io::Result<CapturedOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(&self, command: &str) -> io::Result<CapturedOutput> {
        (**self).run(command)
    }
}

/// Runs commands with `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> io::Result<CapturedOutput> {
        let output = shell_command(command).output()?;
        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
            success: output.status.success(),
        })
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Validates then runs a single command.
pub struct Executor {
    policy: SubstringPolicy,
    runner: Box<dyn CommandRunner>,
}

impl Executor {
    pub fn new(policy: SubstringPolicy) -> Self {
        Self::with_runner(policy, Box::new(ShellRunner))
    }

    pub fn with_runner(policy: SubstringPolicy, runner: Box<dyn CommandRunner>) -> Self {
        Self { policy, runner }
    }

    pub fn policy(&self) -> &SubstringPolicy {
        &self.policy
    }

    /// Validate and run `command`.
    ///
    /// On success returns stdout, or stderr when stdout is empty.
    pub fn execute(&self, command: &str) -> Result<String, ExecError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ExecError::NoCommand);
        }

        let decision = self.policy.validate(command);
        crate::logging::log_decision(command, &decision);
        if !decision.is_allowed() {
            return Err(ExecError::Denied {
                reason: decision.reason,
            });
        }

        let out = self.runner.run(command)?;
        if !out.success {
            log::warn!("command {command:?} exited with {:?}", out.status);
            return Err(ExecError::Failed {
                status: out.status,
                stderr: out.stderr,
            });
        }
        if out.stdout.is_empty() {
            Ok(out.stderr)
        } else {
            Ok(out.stdout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts spawns and replays a canned result.
    struct CountingRunner {
        spawns: AtomicUsize,
        reply: CapturedOutput,
    }

    impl CountingRunner {
        fn new(reply: CapturedOutput) -> Arc<Self> {
            Arc::new(Self {
                spawns: AtomicUsize::new(0),
                reply,
            })
        }

        fn spawns(&self) -> usize {
            self.spawns.load(Ordering::SeqCst)
        }
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, _command: &str) -> io::Result<CapturedOutput> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn captured(stdout: &str, stderr: &str, status: i32) -> CapturedOutput {
        CapturedOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status: Some(status),
            success: status == 0,
        }
    }

    fn policy() -> SubstringPolicy {
        SubstringPolicy::new(&["rm", "del", "format", "rd", "rmdir"], vec!["/srv/allowed".into()])
    }

    fn executor(reply: CapturedOutput) -> (Executor, Arc<CountingRunner>) {
        let runner = CountingRunner::new(reply);
        let exec = Executor::with_runner(policy(), Box::new(Arc::clone(&runner)));
        (exec, runner)
    }

    #[test]
    fn empty_command_spawns_nothing() {
        let (exec, runner) = executor(captured("x", "", 0));
        assert!(matches!(exec.execute(""), Err(ExecError::NoCommand)));
        assert!(matches!(exec.execute("  \t "), Err(ExecError::NoCommand)));
        assert_eq!(runner.spawns(), 0);
    }

    #[test]
    fn denied_command_spawns_nothing() {
        let (exec, runner) = executor(captured("x", "", 0));
        let err = exec.execute("rm -rf /srv/allowed/tmp").unwrap_err();
        match err {
            ExecError::Denied { reason } => assert_eq!(reason, "forbidden program: rm"),
            other => panic!("expected Denied, got {other:?}"),
        }
        assert_eq!(runner.spawns(), 0);
    }

    #[test]
    fn path_denied_command_spawns_nothing() {
        let outside = tempfile::tempdir().unwrap();
        let (exec, runner) = executor(captured("x", "", 0));
        let err = exec
            .execute(&format!("ls {}", outside.path().display()))
            .unwrap_err();
        assert!(matches!(err, ExecError::Denied { .. }));
        assert_eq!(runner.spawns(), 0);
    }

    #[test]
    fn success_returns_stdout() {
        let (exec, runner) = executor(captured("out\n", "info\n", 0));
        assert_eq!(exec.execute("echo out").unwrap(), "out\n");
        assert_eq!(runner.spawns(), 1);
    }

    #[test]
    fn success_with_empty_stdout_returns_stderr() {
        let (exec, _) = executor(captured("", "info\n", 0));
        assert_eq!(exec.execute("echo out").unwrap(), "info\n");
    }

    #[test]
    fn success_with_no_output_is_empty() {
        let (exec, _) = executor(captured("", "", 0));
        assert_eq!(exec.execute("true").unwrap(), "");
    }

    #[test]
    fn nonzero_exit_carries_stderr() {
        let (exec, _) = executor(captured("partial", "boom\n", 2));
        match exec.execute("false").unwrap_err() {
            ExecError::Failed { status, stderr } => {
                assert_eq!(status, Some(2));
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    /// A runner whose shell cannot be started.
    struct UnstartableRunner;

    impl CommandRunner for UnstartableRunner {
        fn run(&self, _command: &str) -> io::Result<CapturedOutput> {
            Err(io::Error::new(io::ErrorKind::NotFound, "sh: not found"))
        }
    }

    #[test]
    fn spawn_failure_is_spawn_error() {
        let exec = Executor::with_runner(policy(), Box::new(UnstartableRunner));
        match exec.execute("echo hi").unwrap_err() {
            ExecError::Spawn(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[test]
    fn failed_message_mentions_stderr() {
        let err = ExecError::Failed {
            status: Some(1),
            stderr: "no such thing".into(),
        };
        assert_eq!(err.to_string(), "command failed: no such thing");
        assert_eq!(ExecError::NoCommand.to_string(), "no command supplied");
    }

    // ── Real shell ──

    #[cfg(unix)]
    #[test]
    fn shell_runner_captures_stdout() {
        let exec = Executor::new(policy());
        assert_eq!(exec.execute("echo shellgate-out").unwrap(), "shellgate-out\n");
    }

    #[cfg(unix)]
    #[test]
    fn shell_runner_falls_back_to_stderr() {
        let exec = Executor::new(policy());
        assert_eq!(exec.execute("echo shellgate-info >&2").unwrap(), "shellgate-info\n");
    }

    #[cfg(unix)]
    #[test]
    fn shell_runner_reports_failure() {
        let exec = Executor::new(policy());
        match exec.execute("echo shellgate-oops >&2; exit 3").unwrap_err() {
            ExecError::Failed { status, stderr } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "shellgate-oops\n");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
