use log::*;
use spawn_os::process::wait_any;
use spawn_os::signal;
use spawn_os::spawn::{Command, SpawnOptions};
use spawn_os::time::sleep_microseconds;
use std::ffi::OsString;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Opt {
    /// Close the standard output of the child before running it.
    #[structopt(long)]
    suppress_stdout: bool,

    /// Replace the environment of the child. May be repeated; nothing is
    /// inherited once given.
    #[structopt(long = "env", value_name = "KEY=VALUE", parse(from_os_str))]
    env: Vec<OsString>,

    /// Run the child with an empty environment.
    #[structopt(long)]
    clear_env: bool,

    /// Ignore SIGINT, SIGQUIT, SIGHUP and SIGTSTP here and in the child.
    #[structopt(long)]
    ignore_signals: bool,

    /// Microseconds to sleep before spawning.
    #[structopt(long, default_value = "0")]
    delay: u64,

    /// Program to run, followed by the rest of its argument vector.
    #[structopt(parse(from_os_str), set(structopt::clap::ArgSettings::Last))]
    args: Vec<OsString>,
}

impl Opt {
    fn spawn_options(&self) -> SpawnOptions {
        let mut opts = SpawnOptions::new();
        opts.suppress_stdout(self.suppress_stdout);
        if self.clear_env || !self.env.is_empty() {
            opts.environment(&self.env);
        }
        opts
    }
}

fn run(opt: &Opt) -> i32 {
    if opt.args.is_empty() {
        error!("missing program; pass it after `--`");
        return 2;
    }

    if opt.ignore_signals {
        signal::ignore_job_control_signals();
    }
    if opt.delay > 0 {
        debug!("sleeping {}us before spawning", opt.delay);
        sleep_microseconds(opt.delay);
    }

    info!("running {:?}", opt.args);
    let child = match Command::new_from_args(&opt.args).spawn(&opt.spawn_options()) {
        Ok(child) => child,
        Err(e) => {
            error!("cannot spawn {:?}: {}", opt.args[0], e);
            return 1;
        }
    };

    loop {
        match wait_any() {
            Ok(Some(report)) if report.process == child => {
                info!("{} terminated: {}", child, report.reason);
                return report.reason.shell_status();
            }
            Ok(Some(report)) => {
                warn!("reaped unrelated child {}: {}", report.process, report.reason);
            }
            Ok(None) => {
                error!("{} vanished before it was reaped", child);
                return 1;
            }
            Err(e) => panic!("cannot wait for {}: {}", child, e),
        }
    }
}

fn main() {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let opt = Opt::from_args();
    let status = run(&opt);
    debug!("bye (status = {})", status);
    std::process::exit(status);
}
