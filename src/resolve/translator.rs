use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::TranslatorConfig;

/// Why the external translator produced no command.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("translator `{0}` is not installed or not on PATH")]
    NotInstalled(String),
    #[error("translator timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
    #[error("translator exited with {}: {stderr}", status_text(.code))]
    Failed { code: Option<i32>, stderr: String },
    #[error("translator program is not configured")]
    NotConfigured,
    #[error("translator I/O error: {0}")]
    Io(#[from] io::Error),
}

fn status_text(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (killed by signal)".into(),
    }
}

/// Turns an instruction into a shell command line.
pub trait Translator: Send + Sync {
    /// Translate `instruction`, giving up once `timeout` has elapsed.
    fn translate(&self, instruction: &str, timeout: Duration) -> Result<String, TranslateError>;
}

impl<T: Translator + ?Sized> Translator for std::sync::Arc<T> {
    fn translate(&self, instruction: &str, timeout: Duration) -> Result<String, TranslateError> {
        (**self).translate(instruction, timeout)
    }
}

/// Translator backed by an external CLI, run as
/// `<program...> <instruction> <mode_flag>` without a shell in between.
#[derive(Debug, Clone)]
pub struct CliTranslator {
    program: Vec<String>,
    mode_flag: String,
}

/// Interval between child status polls while waiting on the translator.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl CliTranslator {
    pub fn new(program: Vec<String>, mode_flag: impl Into<String>) -> Self {
        Self {
            program,
            mode_flag: mode_flag.into(),
        }
    }

    /// Build from config; the program string is split with shlex.
    pub fn from_config(config: &TranslatorConfig) -> Self {
        let program = shlex::split(&config.program).unwrap_or_else(|| {
            config
                .program
                .split_whitespace()
                .map(String::from)
                .collect()
        });
        Self::new(program, config.mode_flag.clone())
    }

    fn command(&self, instruction: &str) -> Result<Command, TranslateError> {
        let (bin, extra) = self
            .program
            .split_first()
            .ok_or(TranslateError::NotConfigured)?;
        let mut cmd = Command::new(bin);
        cmd.args(extra).arg(instruction);
        if !self.mode_flag.is_empty() {
            cmd.arg(&self.mode_flag);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(cmd)
    }
}

impl Translator for CliTranslator {
    fn translate(&self, instruction: &str, timeout: Duration) -> Result<String, TranslateError> {
        let mut cmd = self.command(instruction)?;
        log::info!("calling translator {:?}", self.program);
        let output = run_with_timeout(&mut cmd, timeout).map_err(|e| match e {
            TranslateError::Io(io) if io.kind() == io::ErrorKind::NotFound => {
                TranslateError::NotInstalled(self.program.join(" "))
            }
            other => other,
        })?;
        if !output.status.success() {
            return Err(TranslateError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let command = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::info!("translator returned {command:?}");
        Ok(command)
    }
}

/// Spawn `cmd` and poll it until it exits or `timeout` elapses.
///
/// Both pipes are drained on their own threads while polling, so a child
/// that writes more than the pipe buffer still runs to completion. On
/// timeout the child is killed and reaped; the readers are left to finish
/// on their own, since a grandchild may still hold the pipes open.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, TranslateError> {
    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TranslateError::TimedOut(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    };
    Ok(Output {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("pipe reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CliTranslator {
        CliTranslator::new(vec!["sh".into(), "-c".into(), script.into(), "sh".into()], "")
    }

    #[test]
    fn from_config_splits_program() {
        let config = TranslatorConfig {
            enabled: true,
            timeout_secs: 5,
            program: "npx 'gemini cli'".into(),
            mode_flag: "--shell".into(),
        };
        let t = CliTranslator::from_config(&config);
        assert_eq!(t.program, vec!["npx", "gemini cli"]);
        assert_eq!(t.mode_flag, "--shell");
    }

    #[test]
    fn empty_program_not_configured() {
        let t = CliTranslator::new(Vec::new(), "--shell");
        let err = t.translate("list files", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TranslateError::NotConfigured));
    }

    #[test]
    fn missing_program_not_installed() {
        let t = CliTranslator::new(vec!["shellgate-no-such-translator".into()], "--shell");
        let err = t.translate("list files", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TranslateError::NotInstalled(_)), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn passes_instruction_then_flag() {
        // $1 is the instruction, $2 the mode flag.
        let t = CliTranslator::new(
            vec!["sh".into(), "-c".into(), "printf '%s|%s' \"$2\" \"$1\"".into(), "sh".into()],
            "--shell",
        );
        let out = t.translate("list files", Duration::from_secs(5)).unwrap();
        assert_eq!(out, "--shell|list files");
    }

    #[cfg(unix)]
    #[test]
    fn output_is_trimmed() {
        let t = sh("printf '  ls -la  \\n\\n'");
        assert_eq!(t.translate("x", Duration::from_secs(5)).unwrap(), "ls -la");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_failure() {
        let t = sh("echo quota exceeded >&2; exit 4");
        let err = t.translate("x", Duration::from_secs(5)).unwrap_err();
        match err {
            TranslateError::Failed { code, stderr } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr, "quota exceeded");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn large_stderr_failure_is_not_a_timeout() {
        // Well past the pipe buffer, so the child would block if nobody read.
        let t = sh("head -c 200000 /dev/zero | tr '\\0' x >&2; exit 1");
        let start = Instant::now();
        let err = t.translate("x", Duration::from_secs(3)).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
        match err {
            TranslateError::Failed { code, stderr } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr.len(), 200_000);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn large_stdout_is_returned_whole() {
        let t = sh("head -c 150000 /dev/zero | tr '\\0' y");
        let out = t.translate("x", Duration::from_secs(3)).unwrap();
        assert_eq!(out.len(), 150_000);
        assert!(out.bytes().all(|b| b == b'y'));
    }

    #[cfg(unix)]
    #[test]
    fn slow_translator_times_out() {
        let t = sh("sleep 5");
        let start = Instant::now();
        let err = t.translate("x", Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, TranslateError::TimedOut(_)), "{err:?}");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            TranslateError::TimedOut(Duration::from_secs(15)).to_string(),
            "translator timed out after 15s"
        );
        assert_eq!(
            TranslateError::Failed {
                code: Some(2),
                stderr: "bad".into()
            }
            .to_string(),
            "translator exited with status 2: bad"
        );
    }
}
