//! Bounded subprocess execution for everything the harness spawns.
use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How long output readers may lag behind the child's exit.
const READER_GRACE: Duration = Duration::from_millis(500);

type PipeBytes = std::io::Result<Vec<u8>>;

/// Captured result of one bounded invocation.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status; `None` when the child was killed on timeout.
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|status| status.success())
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Describe a failed invocation for error messages.
    pub fn failure_summary(&self) -> String {
        if self.timed_out {
            return format!("timed out after {} ms", self.elapsed.as_millis());
        }
        let status = self
            .status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown status".to_string());
        format!("exited with {status}: {}", self.stderr_text().trim())
    }
}

/// Split a configured command line into program + args.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let args =
        shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if args.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    Ok(args)
}

/// Run `program args...` with extra `envs`, feeding `stdin` if given and
/// killing the child's process group once `timeout` elapses. Spawn failures
/// are errors; a non-zero exit or timeout is reported through
/// [`ProcessOutput`]. `elapsed` is stamped when the child exits.
pub fn run_bounded(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: &[(&str, &str)],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<ProcessOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().copied())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().with_context(|| format!("spawn {program}"))?;
    let pid = child.id();

    if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
        let bytes = bytes.to_vec();
        // A child that exits without draining stdin yields a broken pipe.
        thread::spawn(move || {
            let _ = pipe.write_all(&bytes);
        });
    }
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let (exit_tx, exit_rx) = mpsc::channel();
    thread::spawn(move || {
        let status = child.wait();
        let _ = exit_tx.send((status, Instant::now()));
    });

    let (status, exited_at, timed_out) = match exit_rx.recv_timeout(timeout) {
        Ok((status, exited_at)) => {
            (Some(status.context("wait for child")?), exited_at, false)
        }
        Err(RecvTimeoutError::Timeout) => {
            kill_group(pid);
            // The waiter reaps the killed child; its status is not reported.
            let _ = exit_rx.recv();
            (None, Instant::now(), true)
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(anyhow!("child waiter for {program} exited unexpectedly"));
        }
    };
    let elapsed = exited_at.duration_since(start);

    // Output held open by a lingering descendant must not outlive the budget.
    let deadline = Instant::now() + timeout.saturating_sub(elapsed) + READER_GRACE;
    let stdout = collect(stdout_reader, deadline, pid)?;
    let stderr = collect(stderr_reader, deadline, pid)?;

    tracing::debug!(
        program,
        elapsed_ms = elapsed.as_millis() as u64,
        timed_out,
        "subprocess complete"
    );

    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        timed_out,
        elapsed,
    })
}

/// Kill the child and everything it spawned.
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only signals; the group was created for this child.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(pid: u32) {
    let pid = pid.to_string();
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", pid.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<PipeBytes> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    rx
}

/// Wait for a reader until `deadline`; past it the process group is killed
/// and whatever the reader holds is dropped.
fn collect(reader: Option<Receiver<PipeBytes>>, deadline: Instant, pid: u32) -> Result<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.context("read child output"),
        Err(RecvTimeoutError::Timeout) => {
            kill_group(pid);
            tracing::debug!(pid, "output still held open; detaching reader");
            Ok(Vec::new())
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader exited unexpectedly")),
    }
}
