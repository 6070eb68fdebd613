//! Spawn a new process.
use super::argv::{CStringArray, MarshalError};
use super::process::Process;
use errno::{errno, Errno};
use failure::Fail;
use log::*;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Exit status of a child whose `exec` failed.
pub const EXEC_FAILED_STATUS: i32 = 127;

/// Configure and spawn processes.
#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
}

/// Advanced configurations for spawning a process ([`Command.spawn`]).
///
/// The two options are independent: any combination is valid.
///
/// [`Command.spawn`]: struct.Command.html#method.spawn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Close fd 1 in the child before `exec`, so writes to stdout fail.
    pub suppress_stdout: bool,
    /// `KEY=VALUE` entries replacing the whole environment of the child.
    /// `None` inherits the current environment.
    pub environment: Option<Vec<OsString>>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress_stdout(&mut self, suppress: bool) -> &mut Self {
        self.suppress_stdout = suppress;
        self
    }

    /// Replaces the environment with `entries`, each formatted `KEY=VALUE`.
    /// Nothing from the current environment is merged in.
    pub fn environment<I, S>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.environment = Some(
            entries
                .into_iter()
                .map(|entry| entry.as_ref().to_os_string())
                .collect(),
        );
        self
    }

    /// Adds `key=value` to the replacement environment, starting an empty one
    /// if none was set.
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(&mut self, key: K, value: V) -> &mut Self {
        let key = key.as_ref();
        let value = value.as_ref();

        let mut entry = OsString::with_capacity(key.len() + value.len() + 1);
        entry.push(key);
        entry.push("=");
        entry.push(value);

        self.environment.get_or_insert_with(Vec::new).push(entry);
        self
    }
}

/// Error type for spawning.
#[derive(Debug, Fail)]
pub enum SpawnError {
    #[fail(display = "cannot build arguments: {}", _0)]
    Marshal(#[fail(cause)] MarshalError),
    #[fail(display = "cannot fork: {}", _0)]
    Fork(Errno),
}

impl SpawnError {
    /// The OS error code, if the failure came from the OS.
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            SpawnError::Fork(errno) => Some(errno.0),
            SpawnError::Marshal(_) => None,
        }
    }
}

impl From<MarshalError> for SpawnError {
    fn from(e: MarshalError) -> Self {
        SpawnError::Marshal(e)
    }
}

impl Command {
    /// Constructs a new `Command` for launching `program`, with the
    /// following default configuration:
    ///
    /// * Empty argument vector. Unlike `std::process::Command`, argv[0] is
    ///   not filled in: add it with [`arg`] if the program expects one.
    /// * `PATH` is searched when `program` has no slash.
    ///
    /// [`arg`]: #method.arg
    pub fn new<S: AsRef<OsStr>>(program: S) -> Command {
        Command {
            program: program.as_ref().to_os_string(),
            args: vec![],
        }
    }

    /// Constructs a new `Command`, where the program is `array[0]` and the
    /// argument vector is the whole `array`.
    ///
    /// # Panics
    /// If program name is missing. (`args` doesn't has any item.)
    pub fn new_from_args<U: AsRef<OsStr>, I: IntoIterator<Item = U>>(args: I) -> Command {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let mut cmd = Command::new(args.first().expect("missing program name"));
        cmd.args(args.iter());
        cmd
    }

    /// Appends one element to the argument vector.
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Command {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends multiple elements to the argument vector.
    pub fn args<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(&mut self, args: I) -> &mut Command {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Forks and execs the program. Returns once the child exists; does not
    /// wait for it.
    ///
    /// Marshalling errors are reported before anything is forked. A failed
    /// `exec` is not reported here: the child exits with
    /// [`EXEC_FAILED_STATUS`], which `wait_any` later reports as a normal
    /// exit. Programs that exit with 127 on their own look the same.
    ///
    /// [`EXEC_FAILED_STATUS`]: constant.EXEC_FAILED_STATUS.html
    pub fn spawn(&self, opts: &SpawnOptions) -> Result<Process, SpawnError> {
        // Everything the child touches is allocated here, before fork.
        let program =
            CString::new(self.program.as_bytes()).map_err(|_| MarshalError::Program)?;
        let argv = CStringArray::new(&self.args)?;
        let envp = match &opts.environment {
            Some(envs) => Some(CStringArray::new(envs)?),
            None => None,
        };

        let pid = unsafe { fork_exec(&program, &argv, envp.as_ref(), opts.suppress_stdout) }
            .map_err(|errno| {
                warn!(target: "spawn", "cannot fork for {:?}: {}", self.program, errno);
                SpawnError::Fork(errno)
            })?;

        debug!(
            target: "spawn",
            "spawned {:?} as {} (argc = {}, suppress_stdout = {}, env = {})",
            self.program,
            pid,
            argv.len(),
            opts.suppress_stdout,
            envp.as_ref().map_or("inherited".to_string(), |e| format!("{} entries", e.len())),
        );
        Ok(pid.into())
    }
}

/// Spawns `program` with exactly `argv` as its argument vector.
pub fn spawn<P, I, S>(program: P, argv: I, opts: &SpawnOptions) -> Result<Process, SpawnError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program).args(argv).spawn(opts)
}

/// Really do the fork & exec stuff. Returns the child's pid in the parent.
///
/// Between `fork` and `exec` the child runs only async-signal-safe calls:
/// the parent may have other threads holding locks at the time of `fork`.
unsafe fn fork_exec(
    program: &CString,
    argv: &CStringArray,
    envp: Option<&CStringArray>,
    suppress_stdout: bool,
) -> Result<u32, Errno> {
    match libc::fork() {
        // Fork has failed.
        -1 => Err(errno()),
        // fork() = 0: we are in the child process.
        0 => {
            if suppress_stdout {
                libc::close(libc::STDOUT_FILENO);
            }
            match envp {
                Some(envp) => libc::execvpe(program.as_ptr(), argv.as_ptr(), envp.as_ptr()),
                None => libc::execvp(program.as_ptr(), argv.as_ptr()),
            };
            // If we have reached here, exec has encountered error.
            libc::_exit(EXEC_FAILED_STATUS)
        }
        // We are in the parent process.
        pid => Ok(pid as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_inherits_everything() {
        let opts = SpawnOptions::new();
        assert!(!opts.suppress_stdout);
        assert_eq!(opts.environment, None);
    }

    #[test]
    fn env_formats_key_value() {
        let mut opts = SpawnOptions::new();
        opts.env("FOO", "bar").env("EMPTY", "");
        assert_eq!(
            opts.environment,
            Some(vec![OsString::from("FOO=bar"), OsString::from("EMPTY=")])
        );
    }

    #[test]
    fn environment_replaces_previous_entries() {
        let mut opts = SpawnOptions::new();
        opts.env("OLD", "1").environment(&["NEW=2"]).suppress_stdout(true);
        assert_eq!(opts.environment, Some(vec![OsString::from("NEW=2")]));
        assert!(opts.suppress_stdout);
    }

    #[test]
    fn empty_environment_is_not_inherit() {
        let mut opts = SpawnOptions::new();
        opts.environment(Vec::<String>::new());
        assert_eq!(opts.environment, Some(vec![]));
    }

    #[test]
    fn new_from_args_uses_first_as_program_and_argv0() {
        let cmd = Command::new_from_args(&["echo", "hi"]);
        assert_eq!(cmd.get_program(), "echo");
        assert_eq!(cmd.get_args(), &[OsString::from("echo"), OsString::from("hi")]);
    }

    #[test]
    fn new_leaves_argv_empty() {
        let mut cmd = Command::new("/bin/true");
        assert!(cmd.get_args().is_empty());
        cmd.arg("true").args(&["a", "b"]);
        assert_eq!(cmd.get_args().len(), 3);
    }

    #[test]
    #[should_panic(expected = "missing program name")]
    fn new_from_args_requires_program() {
        Command::new_from_args(Vec::<String>::new());
    }

    // Marshalling failures return before fork, so these never create a child.
    #[test]
    fn null_in_program_fails_before_fork() {
        let err = spawn("/bin/tr\0ue", &["true"], &SpawnOptions::new()).unwrap_err();
        match &err {
            SpawnError::Marshal(MarshalError::Program) => {}
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.os_error_code(), None);
    }

    #[test]
    fn null_in_argv_fails_before_fork() {
        let err = spawn("true", &["true", "a\0b"], &SpawnOptions::new()).unwrap_err();
        match err {
            SpawnError::Marshal(MarshalError::Element { index: 1 }) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn null_in_environment_fails_before_fork() {
        let mut opts = SpawnOptions::new();
        opts.environment(&["A=1", "B=\0"]);
        let err = spawn("true", &["true"], &opts).unwrap_err();
        assert_eq!(err.to_string(), "cannot build arguments: element #1 contains NULL");
    }

    #[test]
    fn fork_error_exposes_code() {
        let err = SpawnError::Fork(Errno(libc::EAGAIN));
        assert_eq!(err.os_error_code(), Some(libc::EAGAIN));
    }
}
