//! External command execution.
//!
//! Every toolchain call goes through [`CommandRunner`], so tests can swap in
//! a fake that records invocations instead of spawning real processes.

use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::env::Environment;

/// Polling interval while waiting on a child with a deadline.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// How long output readers may lag behind the child's exit.
const DRAIN_AFTER_EXIT: Duration = Duration::from_secs(2);
const DRAIN_AFTER_TIMEOUT: Duration = Duration::from_millis(250);

/// Number of trailing stderr lines kept in failure summaries.
const STDERR_TAIL_LINES: usize = 20;

/// One external command: program, arguments, working directory, environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// `None` inherits the parent environment unchanged.
    pub env: Option<Environment>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: None,
        }
    }

    /// Build from an argv prefix such as `["go", "mod", "tidy"]`.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Invocation::new(program.clone()).args(rest.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal or the deadline.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0) && !self.timed_out
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Short human-readable reason for a failed command.
    pub fn failure_summary(&self) -> String {
        let status = if self.timed_out {
            "timed out".to_string()
        } else {
            match self.status {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        };
        let stderr = String::from_utf8_lossy(&self.stderr);
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return status;
        }
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        format!("{}\n{}", status, tail.join("\n"))
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// `Err` means the command could not be started or waited on.
    /// A started command that fails is reported through [`CommandOutput`].
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        (**self).run(invocation)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any command still running after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        SystemRunner { timeout }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        if let Some(env) = &invocation.env {
            cmd.env_clear().envs(env.iter());
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let mut cmd = Self::command(invocation);
        tracing::debug!(target: "runner", command = %invocation, "spawning");

        let Some(timeout) = self.timeout else {
            let output = cmd.output()?;
            return Ok(CommandOutput {
                status: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
                timed_out: false,
            });
        };

        // Own process group: on expiry the kill reaches grandchildren too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                tracing::warn!(
                    target: "runner",
                    command = %invocation,
                    timeout_ms = timeout.as_millis() as u64,
                    "deadline exceeded, killing"
                );
                kill_group(&child);
                let _ = child.kill();
                timed_out = true;
                break child.wait()?;
            }
            thread::sleep(WAIT_POLL);
        };

        // A descendant may still hold the pipes open; never wait on it
        // past the drain deadline.
        let drain_deadline = Instant::now()
            + if timed_out {
                DRAIN_AFTER_TIMEOUT
            } else {
                DRAIN_AFTER_EXIT
            };
        let mut stdout_out = collect(&stdout, drain_deadline);
        let mut stderr_out = collect(&stderr, drain_deadline);
        if stdout_out.is_none() || stderr_out.is_none() {
            kill_group(&child);
            let retry = Instant::now() + DRAIN_AFTER_TIMEOUT;
            if stdout_out.is_none() {
                stdout_out = collect(&stdout, retry);
            }
            if stderr_out.is_none() {
                stderr_out = collect(&stderr, retry);
            }
        }

        Ok(CommandOutput {
            status: status.code(),
            stdout: stdout_out.unwrap_or_default(),
            stderr: stderr_out.unwrap_or_default(),
            timed_out,
        })
    }
}

/// Read a pipe to its end on a helper thread; the buffer arrives on the
/// returned channel once every writer has closed it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// `None` when the pipe was still open at `deadline`.
fn collect(rx: &mpsc::Receiver<Vec<u8>>, deadline: Instant) -> Option<Vec<u8>> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(buf) => Some(buf),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

/// SIGKILL the child's whole process group.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_group(child: &Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) takes plain integers; a negative pid addresses the
    // group created by `process_group(0)` at spawn.
    unsafe {
        let _ = libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_display_joins_args() {
        let inv = Invocation::new("tinygo").args(["build", "-o", "out.wasm"]);
        assert_eq!(inv.to_string(), "tinygo build -o out.wasm");
    }

    #[test]
    fn from_argv_splits_program() {
        let argv = vec!["go".to_string(), "mod".to_string(), "tidy".to_string()];
        let inv = Invocation::from_argv(&argv).unwrap();
        assert_eq!(inv.program, "go");
        assert_eq!(inv.args, vec!["mod", "tidy"]);
        assert!(Invocation::from_argv(&[]).is_none());
    }

    #[test]
    fn failure_summary_keeps_stderr_tail() {
        let out = CommandOutput {
            status: Some(2),
            stderr: b"warning\n\nerror: no main package\n".to_vec(),
            ..Default::default()
        };
        assert!(!out.success());
        assert_eq!(
            out.failure_summary(),
            "exit code 2\nwarning\nerror: no main package"
        );
    }

    #[test]
    fn timed_out_is_never_success() {
        let out = CommandOutput {
            status: Some(0),
            timed_out: true,
            ..Default::default()
        };
        assert!(!out.success());
        assert_eq!(out.failure_summary(), "timed out");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_output_and_env() {
        let env: Environment = [("WASMBED_PROBE", "hello")].into_iter().collect();
        let inv = Invocation::new("sh")
            .args(["-c", "printf '%s' \"$WASMBED_PROBE\"; exit 3"])
            .env(env);
        let out = SystemRunner::new().run(&inv).unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout, b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_kills_on_deadline() {
        let inv = Invocation::new("sh").args(["-c", "exec sleep 5"]);
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let out = runner.run(&inv).unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_deadline_covers_grandchildren() {
        // `sh` forks `sleep` instead of exec-ing it; the sleeper inherits
        // the pipes and must die with its parent.
        let inv = Invocation::new("sh").args(["-c", "echo started; sleep 5; true"]);
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let out = runner.run(&inv).unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "returned after {:?}",
            started.elapsed()
        );
        assert_eq!(out.failure_summary(), "timed out");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_with_timeout_keeps_output_of_fast_command() {
        let inv = Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 4"]);
        let runner = SystemRunner::with_timeout(Some(Duration::from_secs(30)));
        let out = runner.run(&inv).unwrap();
        assert!(!out.timed_out);
        assert_eq!(out.status, Some(4));
        assert_eq!(out.stdout, b"out\n");
        assert_eq!(out.stderr, b"err\n");
    }
}
