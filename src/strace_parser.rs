use crate::log_record::{leading_integer, split_call_line, truncated, LogRecord};
use std::fmt;

pub const MAX_SYSCALL_NAME_LEN: usize = 63;
pub const MAX_ARGS_LEN: usize = 511;
pub const MAX_ERROR_TAG_LEN: usize = 127;

/// One system call from an strace log, e.g.
/// `1234 open("/missing", 0) = -1 ENOENT (No such file or directory)`.
///
/// Fields longer than their `MAX_*` limits are cut short; the tail is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyscallRecord {
    pub pid: Option<i32>,
    pub call_name: String,
    /// Argument text exactly as strace printed it.
    pub raw_args: String,
    /// Non-numeric return values (`?`, hex addresses) come out as 0.
    pub return_value: i64,
    /// Everything after the return value, e.g. `ENOENT (No such file or directory)`.
    pub error_tag: Option<String>,
}

impl LogRecord for SyscallRecord {
    fn parse_line(line: &str) -> Option<SyscallRecord> {
        let call = split_call_line(line)?;

        let (return_token, error_tag) = match call.rest.find(' ') {
            Some(space) => (&call.rest[..space], Some(call.rest[space + 1..].trim())),
            None => (call.rest, None),
        };
        let error_tag = error_tag
            .filter(|tag| !tag.is_empty())
            .map(|tag| truncated(tag, MAX_ERROR_TAG_LEN));

        Some(SyscallRecord {
            pid: call.pid,
            call_name: truncated(call.name, MAX_SYSCALL_NAME_LEN),
            raw_args: truncated(call.args, MAX_ARGS_LEN),
            return_value: leading_integer(return_token),
            error_tag,
        })
    }
}

impl fmt::Display for SyscallRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Parsed: PID={}, Syscall={}, Args='{}', Return={}",
            self.pid.unwrap_or(0),
            self.call_name,
            self.raw_args,
            self.return_value
        )?;
        if let Some(error_tag) = &self.error_tag {
            write!(f, ", Error='{}'", error_tag)?;
        }
        Ok(())
    }
}
