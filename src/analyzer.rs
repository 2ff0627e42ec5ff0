//! Parse the logs each tool left behind and print what was found.
//! No interpretation happens here yet; every record is shown as-is.

use crate::log_record::LogRecord;
use crate::ltrace_parser::LibCallRecord;
use crate::memcheck_parser::{MemcheckRecord, MemcheckSummary};
use crate::strace_parser::SyscallRecord;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use tracing::info;

pub fn analyze_strace(log_path: &Path) -> Result<Vec<SyscallRecord>> {
    println!("\n--- Analyzing Strace Data ---");
    Ok(print_records(SyscallRecord::parse_file(log_path)?, log_path))
}

pub fn analyze_ltrace(log_path: &Path) -> Result<Vec<LibCallRecord>> {
    println!("\n--- Analyzing Ltrace Data ---");
    Ok(print_records(LibCallRecord::parse_file(log_path)?, log_path))
}

pub fn analyze_memcheck(log_path: &Path) -> Result<MemcheckSummary> {
    println!("\n--- Analyzing Memcheck Data ---");
    let records = MemcheckRecord::parse_file(log_path)?;
    info!("{} memcheck lines in {:?}", records.len(), log_path);

    let summary = MemcheckSummary::from_records(&records);
    println!("{}", summary);
    Ok(summary)
}

fn print_records<R: fmt::Display>(records: Vec<R>, log_path: &Path) -> Vec<R> {
    info!("{} records in {:?}", records.len(), log_path);
    for record in &records {
        println!("{}", record);
    }
    records
}
