mod args;

use args::Opt;
use runescope::analyzer::{analyze_ltrace, analyze_memcheck, analyze_strace};
use runescope::{Launcher, PathFinder, Termination, ToolChainRequest};
use std::ffi::OsString;
use std::io;
use std::process::exit;
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

/// Run a program under strace, ltrace and memcheck and parse what they logged.
fn main() {
    let opt = Opt::from_args();

    // RUST_LOG wins over --verbose.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if opt.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();

    exit(run(opt));
}

fn run(opt: Opt) -> i32 {
    debug!("{:?}", opt);
    if opt.strace {
        info!("System call tracing enabled.");
    }
    if opt.ltrace {
        info!("Library call tracing enabled.");
    }
    if opt.memcheck {
        info!("Memcheck enabled.");
    }

    let path_finder = PathFinder::from_env();
    let target = &opt.command[0];
    let target_path = match path_finder.find_executable(target) {
        Some(path) => path,
        None => {
            eprintln!(
                "runescope: Error: Target executable '{}' not found or not executable.",
                target
            );
            return 1;
        }
    };
    println!("Target executable: {} (resolved to {})", target, target_path.display());

    // argv[0] becomes the resolved path, the rest goes through untouched.
    let mut target_args: Vec<OsString> = opt.command.iter().map(OsString::from).collect();
    target_args[0] = target_path.clone().into_os_string();

    let mut request = ToolChainRequest::new(target_path, target_args);
    if opt.strace {
        request = request.with_syscall_trace(&opt.strace_log);
    }
    if opt.ltrace {
        request = request.with_libcall_trace(&opt.ltrace_log);
    }
    if opt.memcheck {
        request = request.with_memcheck(&opt.memcheck_log);
    }

    println!("\nExecuting target program...");
    match Launcher::new(path_finder).launch(&request) {
        Ok(Termination::Exited(code)) => {
            println!("Target program exited with status: {}", code);
            analyze_logs(&opt);
            code
        }
        Ok(Termination::KilledBySignal(signal)) => {
            eprintln!(
                "runescope: Target program terminated by signal {} ({:?})",
                signal as i32, signal
            );
            analyze_logs(&opt);
            128 + signal as i32
        }
        Err(e) => {
            eprintln!("runescope: Error executing target program: {}", e);
            1
        }
    }
}

/// A log that can't be read is reported and skipped; it doesn't change the exit code.
fn analyze_logs(opt: &Opt) {
    if opt.strace {
        println!("Strace output written to: {}", opt.strace_log.display());
        if let Err(e) = analyze_strace(&opt.strace_log) {
            eprintln!("runescope: {:#}", e);
        }
    }
    if opt.ltrace {
        println!("Ltrace output written to: {}", opt.ltrace_log.display());
        if let Err(e) = analyze_ltrace(&opt.ltrace_log) {
            eprintln!("runescope: {:#}", e);
        }
    }
    if opt.memcheck {
        println!("Valgrind output written to: {}", opt.memcheck_log.display());
        if let Err(e) = analyze_memcheck(&opt.memcheck_log) {
            eprintln!("runescope: {:#}", e);
        }
    }
}
