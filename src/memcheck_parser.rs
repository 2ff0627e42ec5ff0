//! Reader for memcheck's `--log-file` output. Every line it writes carries a
//! `==<pid>==` prefix; the interesting parts are the error and leak summaries.

use crate::log_record::LogRecord;
use std::fmt;

/// One `==<pid>== <message>` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemcheckRecord {
    pub pid: i32,
    pub message: String,
}

impl LogRecord for MemcheckRecord {
    fn parse_line(line: &str) -> Option<MemcheckRecord> {
        let rest = line.trim_start().strip_prefix("==")?;
        let end = rest.find("==")?;
        let pid = rest[..end].parse().ok()?;
        let message = rest[end + 2..].trim();
        if message.is_empty() {
            return None;
        }

        Some(MemcheckRecord {
            pid,
            message: message.to_string(),
        })
    }
}

/// Counts pulled from the end-of-run summaries. Fields are `None` when memcheck
/// didn't print them, e.g. no leak summary when nothing was allocated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemcheckSummary {
    pub errors: Option<u64>,
    pub error_contexts: Option<u64>,
    pub definitely_lost_bytes: Option<u64>,
    pub indirectly_lost_bytes: Option<u64>,
    pub possibly_lost_bytes: Option<u64>,
    pub still_reachable_bytes: Option<u64>,
}

impl MemcheckSummary {
    pub fn from_records(records: &[MemcheckRecord]) -> MemcheckSummary {
        let mut summary = MemcheckSummary::default();

        for record in records {
            let message = record.message.as_str();
            if let Some(counts) = message.strip_prefix("ERROR SUMMARY:") {
                // "3 errors from 2 contexts (suppressed: 0 from 0)"
                let mut words = counts.split_whitespace();
                summary.errors = words.next().and_then(parse_count);
                summary.error_contexts = words.nth(2).and_then(parse_count);
            } else if let Some((kind, bytes)) = leak_line(message) {
                let slot = match kind {
                    "definitely lost" => &mut summary.definitely_lost_bytes,
                    "indirectly lost" => &mut summary.indirectly_lost_bytes,
                    "possibly lost" => &mut summary.possibly_lost_bytes,
                    "still reachable" => &mut summary.still_reachable_bytes,
                    _ => continue,
                };
                *slot = Some(bytes);
            }
        }

        summary
    }
}

/// "definitely lost: 1,024 bytes in 3 blocks" -> ("definitely lost", 1024)
fn leak_line(message: &str) -> Option<(&str, u64)> {
    let colon = message.find(':')?;
    let kind = message[..colon].trim();
    let bytes = message[colon + 1..].split_whitespace().next()?;
    Some((kind, parse_count(bytes)?))
}

fn parse_count(word: &str) -> Option<u64> {
    word.replace(',', "").parse().ok()
}

impl fmt::Display for MemcheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn field(value: Option<u64>) -> String {
            value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
        }

        writeln!(
            f,
            "Memcheck: Errors={}, Contexts={}",
            field(self.errors),
            field(self.error_contexts)
        )?;
        write!(
            f,
            "Leaks (bytes): Definitely={}, Indirectly={}, Possibly={}, Reachable={}",
            field(self.definitely_lost_bytes),
            field(self.indirectly_lost_bytes),
            field(self.possibly_lost_bytes),
            field(self.still_reachable_bytes)
        )
    }
}
