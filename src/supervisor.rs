//! Runs one child process to completion while relaying signals to it.
//!
//! The supervisor listens for every signal in [`SIGNALS_TO_FORWARD`] and sends each one it
//! receives to the child, for as long as the child runs. Termination is observed with
//! `waitid(WNOWAIT)`, which leaves the child a zombie: the relay is stopped before the child is
//! reaped with `wait4`, so a forwarded signal can never reach a recycled PID. `wait4` also yields
//! the child's resource usage, from which the CPU times are taken.

use std::ffi::{OsStr, OsString};
use std::io;
use std::mem::MaybeUninit;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{Id, WaitPidFlag, waitid};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal as install_handler};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ResultOkLogExt;

/// Signals relayed to the child. `SIGKILL` and `SIGSTOP` cannot be caught and are never
/// forwarded.
pub const SIGNALS_TO_FORWARD: [Signal; 8] = [
    Signal::SIGCONT,
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGPROF,
    Signal::SIGQUIT,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

const SIGNAL_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to install handler for {signal}: {source}")]
    InstallHandler {
        signal: Signal,
        #[source]
        source: io::Error,
    },
    #[error("failed to run command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: io::Error,
    },
    #[error("child {pid} terminated without an exit status (wait status {status:#x})")]
    NoExitStatus { pid: Pid, status: i32 },
    #[error("supervisor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The child called `exit` with this status.
    Exited(i32),
    /// The child was killed by this signal number.
    Signaled(i32),
}

impl Termination {
    /// Exit code the supervisor itself should exit with.
    ///
    /// A child killed by signal `n` maps to `128 + n`, as in POSIX shells.
    pub fn exit_code(self) -> u8 {
        match self {
            Termination::Exited(code) => (code & 0xff) as u8,
            Termination::Signaled(signo) => (128 + (signo & 0x7f)) as u8,
        }
    }
}

/// Wall-clock and CPU time of one supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingRecord {
    /// Monotonic time from just before spawn until termination was observed.
    pub wall_time: Duration,
    /// User-mode CPU time of the child and its reaped descendants.
    pub user_cpu_time: Duration,
    /// Kernel-mode CPU time of the child and its reaped descendants.
    pub sys_cpu_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub timing: TimingRecord,
    pub termination: Termination,
}

/// Spawns `program` with `args`, relays signals to it and waits for it to terminate.
///
/// The child inherits stdin, stdout, stderr and the environment. Must be called from within a
/// Tokio runtime.
///
/// # Errors
///
/// - [`Error::InstallHandler`] if a signal handler cannot be installed.
/// - [`Error::Spawn`] if the program cannot be started; no timing is recorded then.
/// - [`Error::Wait`] / [`Error::NoExitStatus`] if the child's termination cannot be retrieved.
pub async fn supervise(program: &OsStr, args: &[OsString]) -> Result<Outcome> {
    let (tx, rx) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);
    // Installed before spawn: from here on, none of these signals can kill the supervisor.
    let listeners = Listeners::install(&tx)?;
    drop(tx);

    let start = Instant::now();
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| Error::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;
    let pid = Pid::from_raw(child.id() as i32);
    log::debug!("Spawned `{}` as {pid}", program.to_string_lossy());

    let (stop_tx, stop_rx) = oneshot::channel();
    let relay = tokio::spawn(relay_signals(pid, rx, stop_rx));

    let observed = tokio::task::spawn_blocking(move || wait_for_termination(pid)).await?;

    // Relay first, reap second. The relay is already gone if its queue closed.
    stop_tx.send(()).ok();
    relay.await?;
    drop(listeners);

    let ended = observed?;
    let (status, rusage) = reap(pid)?;
    drop(child);

    let termination = decode_status(pid, status)?;
    match termination {
        Termination::Exited(code) => log::debug!("Child {pid} exited with status {code}"),
        Termination::Signaled(signo) => log::warn!(
            "Child {pid} was killed by {}",
            Signal::try_from(signo)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| format!("signal {signo}"))
        ),
    }

    Ok(Outcome {
        timing: TimingRecord {
            wall_time: ended.saturating_duration_since(start),
            user_cpu_time: timeval_to_duration(rusage.ru_utime),
            sys_cpu_time: timeval_to_duration(rusage.ru_stime),
        },
        termination,
    })
}

/// One listener task per forwarded signal, all feeding the relay queue.
///
/// Aborted on drop.
struct Listeners(Vec<JoinHandle<()>>);

impl Listeners {
    fn install(tx: &mpsc::Sender<Signal>) -> Result<Self> {
        let mut tasks = Listeners(Vec::with_capacity(SIGNALS_TO_FORWARD.len()));
        for sig in SIGNALS_TO_FORWARD {
            let mut stream = install_handler(SignalKind::from_raw(sig as i32))
                .map_err(|source| Error::InstallHandler { signal: sig, source })?;
            let tx = tx.clone();
            tasks.0.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
            }));
        }
        Ok(tasks)
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

/// Forwards queued signals to `pid` until told to stop. Closes the queue on return.
async fn relay_signals(pid: Pid, mut rx: mpsc::Receiver<Signal>, mut stop: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            received = rx.recv() => match received {
                Some(sig) => {
                    log::debug!("Forwarding {sig} to {pid}");
                    signal::kill(pid, sig).ok_log(log::Level::Debug);
                }
                None => break,
            },
        }
    }
    rx.close();
}

/// Blocks until `pid` has terminated, without reaping it. Returns when termination was seen.
fn wait_for_termination(pid: Pid) -> Result<Instant> {
    loop {
        match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
            Ok(_) => return Ok(Instant::now()),
            Err(nix::errno::Errno::EINTR) => continue,
            Err(errno) => {
                return Err(Error::Wait {
                    pid,
                    source: io::Error::from(errno),
                });
            }
        }
    }
}

/// Reaps the terminated `pid`, returning its raw wait status and resource usage.
fn reap(pid: Pid) -> Result<(i32, libc::rusage)> {
    let mut status: i32 = 0;
    let mut rusage: MaybeUninit<libc::rusage> = MaybeUninit::zeroed();

    loop {
        // SAFETY: both pointers are valid for writes for the duration of the call.
        let ret = unsafe { libc::wait4(pid.as_raw(), &mut status, 0, rusage.as_mut_ptr()) };
        if ret >= 0 {
            break;
        }
        let source = io::Error::last_os_error();
        if source.kind() != io::ErrorKind::Interrupted {
            return Err(Error::Wait { pid, source });
        }
    }

    // SAFETY: wait4 succeeded and filled in the struct; it was zero-initialised regardless.
    let rusage = unsafe { rusage.assume_init() };
    Ok((status, rusage))
}

fn decode_status(pid: Pid, status: i32) -> Result<Termination> {
    if libc::WIFEXITED(status) {
        Ok(Termination::Exited(libc::WEXITSTATUS(status)))
    } else if libc::WIFSIGNALED(status) {
        Ok(Termination::Signaled(libc::WTERMSIG(status)))
    } else {
        Err(Error::NoExitStatus { pid, status })
    }
}

fn timeval_to_duration(tv: libc::timeval) -> Duration {
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let usec = u64::try_from(tv.tv_usec.clamp(0, 999_999)).unwrap_or(0);
    Duration::from_secs(secs) + Duration::from_micros(usec)
}
