//! Coarse sleeping.
use errno::errno;
use log::*;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Suspends the calling thread for `micros` microseconds.
///
/// A single `nanosleep` is issued. If a signal handler interrupts it, the
/// sleep ends early and the remaining time is dropped.
pub fn sleep_microseconds(micros: u64) {
    let request = libc::timespec {
        tv_sec: (micros / MICROS_PER_SEC) as libc::time_t,
        tv_nsec: ((micros % MICROS_PER_SEC) * 1_000) as _,
    };
    if unsafe { libc::nanosleep(&request, std::ptr::null_mut()) } == -1 {
        trace!(target: "sleep", "sleep of {}us cut short: {}", micros, errno());
    }
}
