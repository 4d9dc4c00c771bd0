//! External process execution.
//!
//! Every binary the harness touches (the C++ toolchain, the parser, the command interpreter) is run
//! through the [`ProcessRunner`] trait so the phases above it can be driven by a fake in tests.
//!
//! ## Contract
//!
//! - Standard output and standard error are captured and merged into one text. Only the full content
//!   is guaranteed, not the interleaving between the two streams.
//! - A nonzero exit and a timeout are ordinary [`ExecutionOutcome`] values. Only a failure to start
//!   the process at all is an error.
//! - No child is left running once `run` returns: on timeout the child is killed and reaped. On
//!   unix a bounded invocation runs in its own process group, and the whole group is killed once the
//!   child exits or its deadline passes, so grandchildren holding the output pipes go with it.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use jsonharness_core::ExecutionOutcome;

use crate::error::{HarnessError, HarnessResult};

/// How often a child with a deadline is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a bounded invocation waits for its output pipes to close after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub timeout: Option<Duration>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Shell-like rendering for logs and messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Capability to run an external process.
///
/// `Sync` so one runner can be shared by the conformance worker pool.
pub trait ProcessRunner: Sync {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionOutcome>;
}

/// Closures make convenient fakes.
impl<F> ProcessRunner for F
where
    F: Fn(&Invocation) -> HarnessResult<ExecutionOutcome> + Sync,
{
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionOutcome> {
        self(invocation)
    }
}

/// Runs real operating-system processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ExecutionOutcome> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if invocation.timeout.is_some() {
                command.process_group(0);
            }
        }

        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: invocation.program.display().to_string(),
            source,
        })?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe while we wait.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = invocation.timeout.map(|timeout| Instant::now() + timeout);
        let waited = match deadline {
            Some(deadline) => wait_until(&mut child, deadline),
            None => child.wait().map(|status| (status, false)),
        };
        let (status, timed_out) = match waited {
            Ok(waited) => waited,
            Err(source) => {
                kill_group(&child);
                let _ = child.kill();
                let _ = child.wait();
                return Err(HarnessError::io(&invocation.program, source));
            }
        };

        // Anything the child left behind in its group would keep the pipes open
        let drain_deadline = deadline.map(|deadline| {
            kill_group(&child);
            deadline.max(Instant::now()) + DRAIN_GRACE
        });
        let mut output = collect(stdout, drain_deadline);
        output.push_str(&collect(stderr, drain_deadline));

        if timed_out {
            tracing::debug!(command = %invocation.command_line(), "killed after timeout");
            return Ok(ExecutionOutcome::timed_out(output));
        }
        Ok(ExecutionOutcome {
            exit_code: status.code(),
            output,
            timed_out: false,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a drained pipe. With a deadline, a pipe still held open past it yields nothing.
fn collect(reader: Option<mpsc::Receiver<Vec<u8>>>, deadline: Option<Instant>) -> String {
    let bytes = match (reader, deadline) {
        (None, _) => Vec::new(),
        (Some(rx), None) => rx.recv().unwrap_or_default(),
        (Some(rx), Some(deadline)) => rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .unwrap_or_default(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Poll until the child exits or the deadline passes; on deadline kill its group and reap it.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<(ExitStatus, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            kill_group(child);
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the process group led by `child`. A group that is already gone is fine.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
