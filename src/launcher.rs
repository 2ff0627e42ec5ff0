//! Launch a target program under a chain of diagnostic tools.
//!
//! Only one process image is ever spawned: the outermost tool. Every other enabled tool
//! is passed to it as part of its command line, so memcheck runs ltrace which runs
//! strace which runs the target. The nesting order is fixed:
//!
//! | memcheck | ltrace | strace | outermost | nesting                          |
//! |----------|--------|--------|-----------|----------------------------------|
//! | no       | no     | no     | target    | target                           |
//! | no       | no     | yes    | strace    | strace target                    |
//! | no       | yes    | no     | ltrace    | ltrace target                    |
//! | no       | yes    | yes    | ltrace    | ltrace strace target             |
//! | yes      | no     | no     | valgrind  | valgrind -- target               |
//! | yes      | no     | yes    | valgrind  | valgrind -- strace target        |
//! | yes      | yes    | no     | valgrind  | valgrind -- ltrace target        |
//! | yes      | yes    | yes    | valgrind  | valgrind -- ltrace strace target |

use crate::path_finder::PathFinder;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, write, ForkResult, Pid};
use std::env;
use std::ffi::{CString, OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, span, Level};

pub const MEMCHECK_TOOL: &str = "valgrind";
pub const LTRACE_TOOL: &str = "ltrace";
pub const STRACE_TOOL: &str = "strace";

const MEMCHECK_TOOL_FLAG: &str = "--tool=memcheck";
const MEMCHECK_LEAK_FLAGS: [&str; 3] = [
    "--leak-check=full",
    "--show-leak-kinds=all",
    "--track-origins=yes",
];
const MEMCHECK_LOG_FLAG: &str = "--log-file=";
const END_OF_OPTIONS: &str = "--";
const TRACER_OUTPUT_FLAG: &str = "-o";
const TRACE_CHILDREN_FLAG: &str = "-f";

/// Integer status reported for any launch that did not end with a normal exit.
/// Legitimate exit codes are 0..=255, so this never collides with one.
pub const LAUNCH_ERROR_STATUS: i32 = -1;

/// Exit code of a forked child whose `execve` failed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// What to run and which tools to wrap it in.
#[derive(Clone, Debug)]
pub struct ToolChainRequest {
    pub target_path: PathBuf,
    /// argv-style: index 0 is the program name and is replaced by `target_path`.
    pub target_args: Vec<OsString>,
    pub enable_syscall_trace: bool,
    pub enable_libcall_trace: bool,
    pub enable_memcheck: bool,
    pub syscall_log_path: PathBuf,
    pub libcall_log_path: PathBuf,
    pub memcheck_log_path: PathBuf,
}

impl ToolChainRequest {
    /// A request with every tool disabled.
    pub fn new(target_path: impl Into<PathBuf>, target_args: Vec<OsString>) -> ToolChainRequest {
        ToolChainRequest {
            target_path: target_path.into(),
            target_args,
            enable_syscall_trace: false,
            enable_libcall_trace: false,
            enable_memcheck: false,
            syscall_log_path: PathBuf::new(),
            libcall_log_path: PathBuf::new(),
            memcheck_log_path: PathBuf::new(),
        }
    }

    pub fn with_syscall_trace(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.enable_syscall_trace = true;
        self.syscall_log_path = log_path.into();
        self
    }

    pub fn with_libcall_trace(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.enable_libcall_trace = true;
        self.libcall_log_path = log_path.into();
        self
    }

    pub fn with_memcheck(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.enable_memcheck = true;
        self.memcheck_log_path = log_path.into();
        self
    }
}

/// Which program the OS actually executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OuterProgram {
    /// A tool name still to be resolved through the search path.
    Tool(&'static str),
    /// No tool enabled: the target runs directly from its (already resolved) path.
    Target(PathBuf),
}

/// The argument vector for the outermost program, before resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedCommand {
    pub outer: OuterProgram,
    pub argv: Vec<OsString>,
}

/// Build the nested argument vector for `request`. Pure; touches neither the
/// filesystem nor the environment.
pub fn compose_command(request: &ToolChainRequest) -> ComposedCommand {
    let mut argv: Vec<OsString> = Vec::new();
    let mut outer: Option<&'static str> = None;

    if request.enable_memcheck {
        outer = Some(MEMCHECK_TOOL);
        argv.push(MEMCHECK_TOOL.into());
        argv.push(MEMCHECK_TOOL_FLAG.into());

        // One token: valgrind does not accept the log path as a separate argument.
        let mut log_flag = OsString::from(MEMCHECK_LOG_FLAG);
        log_flag.push(&request.memcheck_log_path);
        argv.push(log_flag);

        argv.extend(MEMCHECK_LEAK_FLAGS.iter().map(OsString::from));
        argv.push(END_OF_OPTIONS.into());
    }

    if request.enable_libcall_trace {
        if outer.is_none() {
            outer = Some(LTRACE_TOOL);
        }
        argv.push(LTRACE_TOOL.into());
        push_tracer_flags(&mut argv, request.libcall_log_path.as_os_str());
    }

    if request.enable_syscall_trace {
        if outer.is_none() {
            outer = Some(STRACE_TOOL);
        }
        argv.push(STRACE_TOOL.into());
        push_tracer_flags(&mut argv, request.syscall_log_path.as_os_str());
    }

    argv.push(request.target_path.as_os_str().to_os_string());
    argv.extend(request.target_args.iter().skip(1).cloned());

    let outer = match outer {
        Some(tool) => OuterProgram::Tool(tool),
        None => OuterProgram::Target(request.target_path.clone()),
    };
    ComposedCommand { outer, argv }
}

fn push_tracer_flags(argv: &mut Vec<OsString>, log_path: &OsStr) {
    argv.push(TRACER_OUTPUT_FLAG.into());
    argv.push(log_path.to_os_string());
    argv.push(TRACE_CHILDREN_FLAG.into());
}

/// A composed command whose outermost program has been located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedLaunch {
    pub program: PathBuf,
    pub argv: Vec<OsString>,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("tool '{0}' not found in PATH or not executable")]
    ToolNotFound(String),
    #[error("argument {0:?} contains an interior NUL byte")]
    InvalidArgument(OsString),
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("waitpid failed: {0}")]
    Wait(#[source] nix::Error),
    #[error("target program terminated abnormally: {0}")]
    AbnormalTermination(String),
}

/// How the launched child ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    KilledBySignal(Signal),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exited with status {}", code),
            Termination::KilledBySignal(signal) => {
                write!(f, "terminated by signal {} ({:?})", *signal as i32, signal)
            }
        }
    }
}

pub type LaunchResult = Result<Termination, LaunchError>;

/// Collapse a launch result to a single integer: the child's exit code, or
/// `LAUNCH_ERROR_STATUS` for signal death and launch failures.
pub fn launch_status_code(result: &LaunchResult) -> i32 {
    match result {
        Ok(Termination::Exited(code)) => *code,
        Ok(Termination::KilledBySignal(_)) | Err(_) => LAUNCH_ERROR_STATUS,
    }
}

/// Spawns tool chains and waits for them. Holds the search path used to find the
/// outermost tool.
pub struct Launcher {
    path_finder: PathFinder,
}

impl Launcher {
    pub fn new(path_finder: PathFinder) -> Launcher {
        Launcher { path_finder }
    }

    /// Compose the command and locate its outermost program. Fails with
    /// `ToolNotFound` before anything is spawned.
    pub fn prepare(&self, request: &ToolChainRequest) -> Result<PreparedLaunch, LaunchError> {
        let ComposedCommand { outer, argv } = compose_command(request);

        let program = match outer {
            OuterProgram::Tool(tool) => self
                .path_finder
                .find_executable(tool)
                .ok_or_else(|| LaunchError::ToolNotFound(tool.to_string()))?,
            OuterProgram::Target(path) => path,
        };

        Ok(PreparedLaunch { program, argv })
    }

    /// Run `request` to completion. Blocks until the child exits; there is no timeout.
    pub fn launch(&self, request: &ToolChainRequest) -> LaunchResult {
        let prepared = self.prepare(request)?;
        run_prepared(&prepared)
    }
}

/// Fork, exec `prepared` with the current environment and wait for it.
pub fn run_prepared(prepared: &PreparedLaunch) -> LaunchResult {
    let s = span!(Level::INFO, stringify!(run_prepared), program = ?prepared.program);
    s.in_scope(|| info!("Executing {:?}", prepared.argv));

    // Everything the child needs, down to the NULL-terminated pointer arrays, is built
    // here. After fork the child only calls execve, write and _exit.
    let program = to_cstring(prepared.program.as_os_str())?;
    let argv = prepared
        .argv
        .iter()
        .map(|arg| to_cstring(arg))
        .collect::<Result<Vec<CString>, LaunchError>>()?;
    let envp = inherited_environment();
    let argv_ptrs = exec_array(&argv);
    let envp_ptrs = exec_array(&envp);
    let exec_failure_message = format!("runescope: execve {:?} failed\n", prepared.program);

    match fork().map_err(LaunchError::Fork)? {
        ForkResult::Parent { child } => {
            s.in_scope(|| debug!("Spawned child {}", child));
            let termination = wait_for_child(child);
            s.in_scope(|| match &termination {
                Ok(termination) => info!("Child {} {}", child, termination),
                Err(e) => error!("Child {}: {}", child, e),
            });
            termination
        }
        ForkResult::Child => {
            // Only returns on failure. `argv` and `envp` own the strings the arrays point to.
            unsafe { libc::execve(program.as_ptr(), argv_ptrs.as_ptr(), envp_ptrs.as_ptr()) };
            let _ = write(libc::STDERR_FILENO, exec_failure_message.as_bytes());
            unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
        }
    }
}

fn wait_for_child(child: Pid) -> LaunchResult {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(Termination::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _core_dumped)) => {
                return Ok(Termination::KilledBySignal(signal))
            }
            Ok(status) => return Err(LaunchError::AbnormalTermination(format!("{:?}", status))),
            Err(nix::Error::Sys(Errno::EINTR)) => continue,
            Err(e) => return Err(LaunchError::Wait(e)),
        }
    }
}

fn to_cstring(arg: &OsStr) -> Result<CString, LaunchError> {
    CString::new(arg.as_bytes()).map_err(|_| LaunchError::InvalidArgument(arg.to_os_string()))
}

/// Pointers into `strings`, followed by the NULL terminator execve expects.
/// Only valid while `strings` is alive.
fn exec_array(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// `KEY=VALUE` entries for every variable of the current process.
fn inherited_environment() -> Vec<CString> {
    env::vars_os()
        .filter_map(|(key, value)| {
            let mut entry = key.into_vec();
            entry.push(b'=');
            entry.extend(value.into_vec());
            // The OS never hands us a variable with a NUL in it.
            CString::new(entry).ok()
        })
        .collect()
}
