//! Low-level utilities for spawning and reaping child processes.
//!
//! Build an argument vector with [`argv`], start a child with
//! [`spawn::Command`], and collect its termination with
//! [`process::wait_any`].
pub extern crate libc;
pub extern crate procfs;

pub mod argv;
pub mod process;
pub mod signal;
pub mod spawn;
pub mod time;
