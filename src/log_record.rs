//! Line grammar shared by the tracer log parsers, and the `LogRecord` trait that
//! lifts a per-line parser to a whole log file.
//!
//! A call line looks like `<ws><pid><ws><name>(<args>) = <rest>`. Lines that don't
//! fit (banners, signal notices, unfinished calls) produce no record; parsing just
//! moves on to the next line.

use crate::context;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// One record per well-formed log line.
pub trait LogRecord: Sized {
    /// `None` for any line that does not match the grammar.
    fn parse_line(line: &str) -> Option<Self>;

    /// Parse every line of the log at `path`. Only failing to open or read the file
    /// is an error; malformed lines are skipped.
    fn parse_file(path: &Path) -> Result<Vec<Self>> {
        let file =
            File::open(path).with_context(|| context!("Failed to open log file {:?}.", path))?;
        let mut reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut skipped = 0;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| context!("Failed to read log file {:?}.", path))?;
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            match Self::parse_line(&line) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        debug!(
            "Parsed {} records from {:?}, skipped {} lines.",
            records.len(),
            path,
            skipped
        );
        Ok(records)
    }
}

/// The pieces of a call line, before any field-specific interpretation.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CallLine<'a> {
    /// Leading pid, if the line starts with digits.
    pub pid: Option<i32>,
    pub name: &'a str,
    pub args: &'a str,
    /// Everything after `=` and its following spaces, without the line terminator.
    /// Never empty.
    pub rest: &'a str,
}

/// Split a line into pid, call name, argument text and whatever follows `=`.
pub(crate) fn split_call_line(line: &str) -> Option<CallLine<'_>> {
    let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

    let pid = leading_pid(line);
    let after_pid = line.trim_start_matches(|c: char| c == ' ' || c.is_ascii_digit());
    if after_pid.is_empty() {
        return None;
    }

    let open = after_pid.find('(')?;
    let name = after_pid[..open].trim();
    let close = open + 1 + matching_paren(&after_pid[open + 1..])?;
    let args = &after_pid[open + 1..close];

    let after_args = after_pid[close + 1..].trim_start_matches(' ');
    let after_eq = after_args.strip_prefix('=')?;
    let rest = after_eq.trim_start_matches(' ');
    if rest.is_empty() {
        return None;
    }

    Some(CallLine {
        pid,
        name,
        args,
        rest,
    })
}

/// Byte offset of the `)` closing an already-opened `(`. Parentheses inside
/// double-quoted strings or single-quoted chars (ltrace's `'('`) don't count.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(open_quote) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == open_quote => quote = None,
                _ => {}
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn leading_pid(line: &str) -> Option<i32> {
    let digits = line.trim_start_matches(' ');
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| digits.len());
    digits[..end].parse().ok()
}

/// Permissive integer parse: optional leading spaces and sign, then digits. Anything
/// that doesn't start like a number, or overflows, is 0.
pub(crate) fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let unsigned = s.trim_start_matches(|c: char| c == '+' || c == '-');
    let sign_len = s.len() - unsigned.len();
    if sign_len > 1 {
        return 0;
    }

    let digits_len = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| unsigned.len());
    s[..sign_len + digits_len].parse().unwrap_or(0)
}

/// Keep at most `max_chars` characters. The rest is dropped silently.
pub(crate) fn truncated(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_call() {
        let line = split_call_line("1234 open(\"/etc/passwd\", 0) = 3\n").unwrap();
        assert_eq!(
            line,
            CallLine {
                pid: Some(1234),
                name: "open",
                args: "\"/etc/passwd\", 0",
                rest: "3",
            }
        );
    }

    #[test]
    fn pid_is_optional() {
        let line = split_call_line("close(3) = 0").unwrap();
        assert_eq!(line.pid, None);
        assert_eq!(line.name, "close");
    }

    #[test]
    fn nested_and_quoted_parens() {
        let line = split_call_line("7 write(1, \"a) (b\", f(2)) = 5").unwrap();
        assert_eq!(line.args, "1, \"a) (b\", f(2)");
        assert_eq!(line.rest, "5");

        let line = split_call_line("7 write(1, \"say \\\"hi)\\\"\", 9) = 9").unwrap();
        assert_eq!(line.args, "1, \"say \\\"hi)\\\"\", 9");
    }

    #[test]
    fn single_quoted_chars() {
        let line = split_call_line("1 putchar(')') = 41").unwrap();
        assert_eq!(line.args, "')'");

        let line = split_call_line("1 putchar('\\'') = 39").unwrap();
        assert_eq!(line.args, "'\\''");
        assert_eq!(line.rest, "39");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(split_call_line(""), None);
        assert_eq!(split_call_line("   1234   \n"), None);
        assert_eq!(split_call_line("1234 +++ exited with 0 +++"), None);
        assert_eq!(split_call_line("1234 read(3, <unfinished ...>"), None);
        assert_eq!(split_call_line("1234 close(3) 0"), None);
        assert_eq!(split_call_line("1234 close(3) = "), None);
    }

    #[test]
    fn permissive_integers() {
        assert_eq!(leading_integer("3"), 3);
        assert_eq!(leading_integer("-1 ENOENT"), -1);
        assert_eq!(leading_integer("+42"), 42);
        assert_eq!(leading_integer("  17abc"), 17);
        assert_eq!(leading_integer("0x7f12"), 0);
        assert_eq!(leading_integer("?"), 0);
        assert_eq!(leading_integer("--1"), 0);
        assert_eq!(leading_integer("99999999999999999999999"), 0);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncated("abcdef", 3), "abc");
        assert_eq!(truncated("abc", 3), "abc");
        assert_eq!(truncated("héllo", 2), "hé");
    }
}
