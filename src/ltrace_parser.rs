use crate::log_record::{leading_integer, split_call_line, truncated, LogRecord};
use std::fmt;

pub const MAX_FUNCTION_NAME_LEN: usize = 127;
pub const MAX_ARGS_LEN: usize = 511;

/// One library call from an ltrace log, e.g. `4321 malloc(16) = 0x55d0c2a8e2a0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibCallRecord {
    /// Always `None`. The leading digits are skipped but not kept, so records from
    /// different processes in an `ltrace -f` log can't be told apart.
    pub pid: Option<i32>,
    pub call_name: String,
    pub raw_args: String,
    /// Parsed from the whole remainder after `=`; pointers and `<void>` come out as 0.
    pub return_value: i64,
}

impl LogRecord for LibCallRecord {
    fn parse_line(line: &str) -> Option<LibCallRecord> {
        let call = split_call_line(line)?;

        Some(LibCallRecord {
            pid: None,
            call_name: truncated(call.name, MAX_FUNCTION_NAME_LEN),
            raw_args: truncated(call.args, MAX_ARGS_LEN),
            return_value: leading_integer(call.rest),
        })
    }
}

impl fmt::Display for LibCallRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Parsed Ltrace: PID={}, Function={}, Args='{}', Return={}",
            self.pid.unwrap_or(0),
            self.call_name,
            self.raw_args,
            self.return_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn library_call() {
        let record = LibCallRecord::parse_line("4321 strlen(\"hello\") = 5\n").unwrap();
        assert_eq!(
            record,
            LibCallRecord {
                pid: None,
                call_name: "strlen".to_string(),
                raw_args: "\"hello\"".to_string(),
                return_value: 5,
            }
        );
    }

    #[test]
    fn pid_is_never_extracted() {
        let record = LibCallRecord::parse_line("  77 free(0x55d0c2a8e2a0) = <void>").unwrap();
        assert_eq!(record.pid, None);
        assert_eq!(record.call_name, "free");
        assert_eq!(record.return_value, 0);
    }

    #[test]
    fn remainder_is_the_return_value() {
        let record = LibCallRecord::parse_line("1 atoi(\"-12\") = -12 trailing words").unwrap();
        assert_eq!(record.return_value, -12);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert_eq!(LibCallRecord::parse_line("1 puts(\"x\" <unfinished ...>"), None);
        assert_eq!(LibCallRecord::parse_line("1 +++ exited (status 0) +++"), None);
        assert_eq!(LibCallRecord::parse_line("1 --- SIGSEGV (Segmentation fault) ---"), None);
    }

    #[test]
    fn quoted_paren_chars() {
        let record = LibCallRecord::parse_line("4321 putchar('(') = 40").unwrap();
        assert_eq!(record.call_name, "putchar");
        assert_eq!(record.raw_args, "'('");
        assert_eq!(record.return_value, 40);

        let record =
            LibCallRecord::parse_line("4321 strchr(\"f(x\", '(') = 0x55d0c2a8e2a1").unwrap();
        assert_eq!(record.call_name, "strchr");
        assert_eq!(record.raw_args, "\"f(x\", '('");
    }

    #[test]
    fn long_fields_are_truncated() {
        let name = "f".repeat(200);
        let args = "a".repeat(600);
        let line = format!("1 {}({}) = 0", name, args);
        let record = LibCallRecord::parse_line(&line).unwrap();
        assert_eq!(record.call_name.len(), MAX_FUNCTION_NAME_LEN);
        assert_eq!(record.raw_args.len(), MAX_ARGS_LEN);
        assert_eq!(MAX_FUNCTION_NAME_LEN, 127);
        assert_eq!(MAX_ARGS_LEN, 511);
    }

    #[test]
    fn display_matches_log_format() {
        let record = LibCallRecord::parse_line("1 puts(\"hi\") = 3").unwrap();
        assert_eq!(
            record.to_string(),
            "Parsed Ltrace: PID=0, Function=puts, Args='\"hi\"', Return=3"
        );
    }

    #[test]
    fn file_keeps_going_after_bad_lines() {
        let mut log = NamedTempFile::new().unwrap();
        writeln!(log, "1 __libc_start_main(0x401136, 1, 0x7ffe, 0 <unfinished ...>").unwrap();
        writeln!(log, "1 puts(\"hi\") = 3").unwrap();
        writeln!(log, "garbage").unwrap();
        writeln!(log, "1 exit(0 <no return ...>").unwrap();
        writeln!(log, "1 malloc(16) = 0x602010").unwrap();
        log.flush().unwrap();

        let records = LibCallRecord::parse_file(log.path()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.call_name.as_str()).collect();
        assert_eq!(names, vec!["puts", "malloc"]);
    }
}
