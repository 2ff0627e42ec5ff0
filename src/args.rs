use std::path::PathBuf;
use structopt::clap::AppSettings;
use structopt::StructOpt;

pub const DEFAULT_STRACE_LOG: &str = "runescope_strace.log";
pub const DEFAULT_LTRACE_LOG: &str = "runescope_ltrace.log";
pub const DEFAULT_MEMCHECK_LOG: &str = "runescope_valgrind.log";

#[derive(StructOpt, Debug)]
#[structopt(
    name = "runescope",
    about = "Run a program under strace, ltrace and valgrind memcheck, then parse their logs",
    setting = AppSettings::TrailingVarArg
)]
pub struct Opt {
    /// Debug-level logging when RUST_LOG is not set.
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Trace system calls with strace.
    #[structopt(short = "s", long = "strace", alias = "static")]
    pub strace: bool,

    /// Trace library calls with ltrace.
    #[structopt(short = "l", long = "ltrace")]
    pub ltrace: bool,

    /// Check memory with valgrind memcheck.
    #[structopt(short = "m", long = "memcheck")]
    pub memcheck: bool,

    #[structopt(long = "strace-log", default_value = DEFAULT_STRACE_LOG, parse(from_os_str))]
    pub strace_log: PathBuf,

    #[structopt(long = "ltrace-log", default_value = DEFAULT_LTRACE_LOG, parse(from_os_str))]
    pub ltrace_log: PathBuf,

    #[structopt(long = "memcheck-log", default_value = DEFAULT_MEMCHECK_LOG, parse(from_os_str))]
    pub memcheck_log: PathBuf,

    /// Program to run, followed by its arguments.
    #[structopt(required = true, min_values = 1)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_arguments_are_not_ours() {
        let opt = Opt::from_iter(&["runescope", "-s", "-l", "ls", "-l", "-a"]);
        assert!(opt.strace);
        assert!(opt.ltrace);
        assert!(!opt.memcheck);
        assert_eq!(opt.command, vec!["ls", "-l", "-a"]);
    }

    #[test]
    fn log_paths_default_and_override() {
        let opt = Opt::from_iter(&["runescope", "--memcheck", "--memcheck-log", "mc.log", "true"]);
        assert!(opt.memcheck);
        assert_eq!(opt.memcheck_log, PathBuf::from("mc.log"));
        assert_eq!(opt.strace_log, PathBuf::from(DEFAULT_STRACE_LOG));
        assert_eq!(opt.ltrace_log, PathBuf::from(DEFAULT_LTRACE_LOG));
    }

    #[test]
    fn static_is_an_alias_for_strace() {
        let opt = Opt::from_iter(&["runescope", "--static", "true"]);
        assert!(opt.strace);
    }

    #[test]
    fn command_is_required() {
        assert!(Opt::from_iter_safe(&["runescope", "-s"]).is_err());
    }
}
