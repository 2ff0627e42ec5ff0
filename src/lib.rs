mod utils;

pub mod analyzer;
pub mod launcher;
pub mod log_record;
pub mod ltrace_parser;
pub mod memcheck_parser;
pub mod path_finder;
pub mod strace_parser;

pub use crate::launcher::{
    compose_command, launch_status_code, LaunchError, LaunchResult, Launcher, Termination,
    ToolChainRequest,
};
pub use crate::log_record::LogRecord;
pub use crate::ltrace_parser::LibCallRecord;
pub use crate::memcheck_parser::{MemcheckRecord, MemcheckSummary};
pub use crate::path_finder::{find_executable, PathFinder};
pub use crate::strace_parser::SyscallRecord;
