//! UNIX signal related operations.
//!
//! The only mutation offered here is [`ignore_job_control_signals`], a
//! one-way, process-wide transition: there is no way to restore the previous
//! dispositions through this crate.
//!
//! [`ignore_job_control_signals`]: fn.ignore_job_control_signals.html

use log::*;
use std::fmt;

macro_rules! signal_struct {
    (pub enum $struct_name:ident {
        $($name:ident),*
    }) => {
        /// UNIX signals.
        #[repr(i32)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $struct_name {
            $(
                $name = libc::$name,
            )*
        }

        impl $struct_name {
            /// Convert to string.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(
                        $struct_name::$name => stringify!($name),
                    )*
                }
            }
        }

        impl std::convert::TryFrom<i32> for $struct_name {
            type Error = i32;

            /// Returns `Err(raw_value)` if the variant is not found. Returns
            /// `Ok(signal)` otherwise.
            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $(
                        libc::$name => Ok($struct_name::$name),
                    )*
                    _ => Err(value),
                }
            }
        }
    };
}

signal_struct! {
    pub enum Signal {
        SIGABRT,
        SIGALRM,
        SIGBUS,
        SIGCHLD,
        SIGCONT,
        SIGFPE,
        SIGHUP,
        SIGILL,
        SIGINT,
        SIGIO,
        SIGKILL,
        SIGPIPE,
        SIGPROF,
        SIGPWR,
        SIGQUIT,
        SIGSEGV,
        SIGSTKFLT,
        SIGSTOP,
        SIGTSTP,
        SIGSYS,
        SIGTERM,
        SIGTRAP,
        SIGTTIN,
        SIGTTOU,
        SIGURG,
        SIGUSR1,
        SIGUSR2,
        SIGVTALRM,
        SIGXCPU,
        SIGXFSZ,
        SIGWINCH
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), *self as i32)
    }
}

/// Signals a terminal uses to control its foreground job.
pub const JOB_CONTROL_SIGNALS: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGHUP,
    Signal::SIGTSTP,
];

/// What the process does on receiving a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Default,
    Ignore,
    Handler,
}

impl Disposition {
    fn to_raw(self) -> libc::sighandler_t {
        match self {
            Disposition::Default => libc::SIG_DFL,
            Disposition::Ignore => libc::SIG_IGN,
            Disposition::Handler => unreachable!("handlers are installed elsewhere"),
        }
    }

    fn from_raw(handler: libc::sighandler_t) -> Self {
        match handler {
            libc::SIG_DFL => Disposition::Default,
            libc::SIG_IGN => Disposition::Ignore,
            _ => Disposition::Handler,
        }
    }
}

/// Sets `SIGINT`, `SIGQUIT`, `SIGHUP` and `SIGTSTP` to be ignored by the
/// calling process.
///
/// Idempotent. The new dispositions are inherited by children spawned
/// afterwards and survive their `exec`.
pub fn ignore_job_control_signals() {
    for &signal in &JOB_CONTROL_SIGNALS {
        let prev = set_disposition(signal, Disposition::Ignore);
        debug!(target: "signal", "ignoring {} (was {:?})", signal, prev);
    }
}

/// Returns the current disposition of `signal` without changing it.
pub fn disposition(signal: Signal) -> Disposition {
    let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
    // Passing NULL as the new action only queries.
    let ret = unsafe { libc::sigaction(signal as i32, std::ptr::null(), &mut current) };
    assert_eq!(ret, 0, "cannot query signal handler");
    Disposition::from_raw(current.sa_sigaction)
}

/// Installs `SIG_DFL` or `SIG_IGN` for `signal` and returns the previous
/// disposition. Panics on failure, which only happens for signals that
/// cannot be caught.
fn set_disposition(signal: Signal, disposition: Disposition) -> Disposition {
    unsafe {
        let mut new: libc::sigaction = std::mem::zeroed();
        new.sa_sigaction = disposition.to_raw();
        libc::sigemptyset(&mut new.sa_mask);

        let mut prev: libc::sigaction = std::mem::zeroed();
        assert_eq!(
            libc::sigaction(signal as i32, &new, &mut prev),
            0,
            "cannot manipulate signal handler"
        );
        Disposition::from_raw(prev.sa_sigaction)
    }
}
