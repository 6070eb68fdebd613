use serial_test::serial;
use spawn_os::process::{wait_any, TerminateReason};
use spawn_os::signal::{self, Disposition, Signal, JOB_CONTROL_SIGNALS};
use spawn_os::spawn::{spawn, SpawnOptions};

#[test]
#[serial]
fn job_control_signals_become_ignored() {
    signal::ignore_job_control_signals();
    for &sig in &JOB_CONTROL_SIGNALS {
        assert_eq!(signal::disposition(sig), Disposition::Ignore, "{}", sig);
    }
    // Other signals are left alone.
    assert_eq!(signal::disposition(Signal::SIGTERM), Disposition::Default);

    // Idempotent.
    signal::ignore_job_control_signals();
    assert_eq!(signal::disposition(Signal::SIGINT), Disposition::Ignore);
}

#[test]
#[serial]
fn ignored_signal_is_survivable() {
    signal::ignore_job_control_signals();
    assert_eq!(unsafe { libc::raise(libc::SIGHUP) }, 0);
    assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
}

#[test]
#[serial]
fn children_inherit_ignored_signals() {
    signal::ignore_job_control_signals();
    let child = spawn(
        "sh",
        &["sh", "-c", "kill -INT $$; kill -QUIT $$; exit 7"],
        &SpawnOptions::new(),
    )
    .unwrap();
    let report = wait_any().unwrap().expect("a child to reap");
    assert_eq!(report.process, child);
    assert_eq!(report.reason, TerminateReason::Exit { status: 7 });
}
