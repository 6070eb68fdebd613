//! Process handles and reaping of terminated children.
//!
//! Invoke [`wait_any`] to obtain a [`TerminationReport`].
//!
//! [`wait_any`]: fn.wait_any.html
//! [`TerminationReport`]: struct.TerminationReport.html

use super::signal::Signal;
use errno::{errno, Errno};
use failure::Fail;
use log::*;
use std::convert::TryFrom;
use std::fmt;

/// The terminate reasons for a process vanished from the OS.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TerminateReason {
    /// Low 8 bits of the value the program passed to `exit`. 127 is also
    /// what a child reports when `exec` itself failed.
    Exit { status: i32 },
    /// Raw signal number, kept as-is so real-time signals survive.
    Signal { signal: i32, has_coredump: bool },
}

impl TerminateReason {
    /// Returns `Some(result)` if the status denotes terminated process. Returns
    /// `None` if not this case.
    fn decode(status: i32) -> Option<Self> {
        if libc::WIFSIGNALED(status) {
            Some(TerminateReason::Signal {
                signal: libc::WTERMSIG(status),
                has_coredump: libc::WCOREDUMP(status),
            })
        } else if libc::WIFEXITED(status) {
            Some(TerminateReason::Exit {
                status: libc::WEXITSTATUS(status),
            })
        } else {
            None
        }
    }

    /// `"exit"` or `"signal"`.
    pub fn kind(&self) -> &'static str {
        match self {
            TerminateReason::Exit { .. } => "exit",
            TerminateReason::Signal { .. } => "signal",
        }
    }

    /// The exit status, or the signal number.
    pub fn code(&self) -> i32 {
        match *self {
            TerminateReason::Exit { status } => status,
            TerminateReason::Signal { signal, .. } => signal,
        }
    }

    /// The terminating signal, if it is one of the named [`Signal`]s.
    ///
    /// [`Signal`]: ../signal/enum.Signal.html
    pub fn signal(&self) -> Option<Signal> {
        match *self {
            TerminateReason::Signal { signal, .. } => Signal::try_from(signal).ok(),
            TerminateReason::Exit { .. } => None,
        }
    }

    /// Status as a shell reports it: the exit status, or 128 + signal.
    pub fn shell_status(&self) -> i32 {
        match *self {
            TerminateReason::Exit { status } => status,
            TerminateReason::Signal { signal, .. } => 128 + signal,
        }
    }
}

impl fmt::Display for TerminateReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self, self.signal()) {
            (TerminateReason::Exit { status }, _) => write!(f, "exit {}", status),
            (_, Some(signal)) => write!(f, "signal {}", signal),
            (_, None) => write!(f, "signal {}", self.code()),
        }
    }
}

/// A reaped child and why it terminated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TerminationReport {
    pub process: Process,
    pub reason: TerminateReason,
}

/// Error returned by `wait_any`.
#[derive(Debug, Fail)]
pub enum WaitError {
    #[fail(display = "unexpected wait status: {:#x}", status)]
    UnexpectedStatus { status: i32 },
    #[fail(display = "unknown waitpid error: {}", _0)]
    Os(Errno),
}

/// Blocks until any child terminates, reaps it, and reports why.
///
/// * Returns `Ok(None)` immediately if the calling process has no child.
/// * Each call reaps exactly one child; call repeatedly to drain several.
/// * A status that is neither an exit nor a signal death is reported as
///   `Err(WaitError::UnexpectedStatus)` and never folded into either case.
///
/// Whichever thread waits first reaps the child, so concurrent callers must
/// coordinate among themselves.
pub fn wait_any() -> Result<Option<TerminationReport>, WaitError> {
    let mut status = 0;
    loop {
        match unsafe { libc::waitpid(-1, &mut status as _, 0) } {
            -1 => {
                let err = errno();
                match err.0 {
                    // No child process.
                    libc::ECHILD => return Ok(None),
                    // Interrupted by signal: retry.
                    libc::EINTR => continue,
                    _ => return Err(WaitError::Os(err)),
                }
            }
            pid => {
                let process = Process::from(pid as u32);
                return match TerminateReason::decode(status) {
                    Some(reason) => {
                        debug!(target: "wait", "reaped {}: {}", pid, reason);
                        Ok(Some(TerminationReport { process, reason }))
                    }
                    None => {
                        warn!(target: "wait", "{} changed state with status {:#x}", pid, status);
                        Err(WaitError::UnexpectedStatus { status })
                    }
                };
            }
        }
    }
}

/// Error type for signalling a process.
#[derive(Debug, Fail)]
pub enum KillError {
    #[fail(display = "invalid signal")]
    InvalidSignal,
    #[fail(display = "process not found")]
    NotFound,
    #[fail(display = "permission denied")]
    PermissionDenied,
}

/// Thin wrapper for raw process id.
///
/// Holding a `Process` does not keep the child alive or reap it: the id
/// stays valid until some `wait_any` call reports it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Process {
    pid: u32,
}

impl Process {
    /// Returns the process id of current process.
    pub fn current_pid() -> u32 {
        unsafe { libc::getpid() as _ }
    }

    /// Returns the process id.
    pub fn pid(self) -> u32 {
        self.pid
    }

    /// Sends a signal to the process.
    pub fn send_signal(self, signal: Signal) -> Result<(), KillError> {
        if unsafe { libc::kill(self.pid as _, signal as i32) } == 0 {
            return Ok(());
        }
        Err(match errno() {
            Errno(libc::EINVAL) => KillError::InvalidSignal,
            Errno(libc::EPERM) => KillError::PermissionDenied,
            _ => KillError::NotFound,
        })
    }

    /// Terminate the process. It still has to be reaped.
    pub fn terminate(self) {
        if let Err(e) = self.send_signal(Signal::SIGKILL) {
            warn!(target: "wait", "cannot terminate {}: {}", self.pid, e);
        }
    }

    /// Returns whether the process is running (or stopped) and not yet
    /// terminated.
    pub fn exists(self) -> bool {
        self.state()
            .map(|state| state != 'Z') // Zombie process does not exist
            .unwrap_or(false) // The process has been reaped
    }

    /// Returns whether the process has terminated but was not reaped yet.
    pub fn is_zombie(self) -> bool {
        self.state() == Some('Z')
    }

    /// Returns info from procfs.
    pub fn to_procfs(self) -> procfs::ProcResult<procfs::process::Process> {
        procfs::process::Process::new(self.pid as _)
    }

    fn state(self) -> Option<char> {
        self.to_procfs()
            .and_then(|process| process.stat())
            .map(|stat| stat.state)
            .ok()
    }
}

impl From<u32> for Process {
    fn from(pid: u32) -> Process {
        Process { pid }
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pid)
    }
}
