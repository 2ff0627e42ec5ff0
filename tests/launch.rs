use nix::sys::signal::Signal;
use runescope::{launch_status_code, Launcher, PathFinder, Termination, ToolChainRequest};
use std::ffi::OsString;

fn run(target: &str, args: &[&str]) -> runescope::LaunchResult {
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let request = ToolChainRequest::new(target, args);
    Launcher::new(PathFinder::from_env()).launch(&request)
}

#[test]
fn true_exits_zero() {
    assert_eq!(run("/bin/true", &["true"]).unwrap(), Termination::Exited(0));
}

#[test]
fn false_exits_one() {
    let result = run("/bin/false", &["false"]);
    assert_eq!(launch_status_code(&result), 1);
}

#[test]
fn exit_code_is_forwarded() {
    let result = run("/bin/sh", &["sh", "-c", "exit 42"]);
    assert_eq!(result.unwrap(), Termination::Exited(42));
}

#[test]
fn target_arguments_are_forwarded() {
    let result = run(
        "/bin/sh",
        &["sh", "-c", "[ \"$0\" = one ] && [ \"$1\" = two ] && exit 5", "one", "two"],
    );
    assert_eq!(result.unwrap(), Termination::Exited(5));
}

#[test]
fn signal_death_is_reported() {
    let result = run("/bin/sh", &["sh", "-c", "kill -9 $$"]);
    assert_eq!(result.unwrap(), Termination::KilledBySignal(Signal::SIGKILL));
}

#[test]
fn environment_is_inherited() {
    std::env::set_var("RUNESCOPE_LAUNCH_MARKER", "present");
    let result = run(
        "/bin/sh",
        &["sh", "-c", "[ \"$RUNESCOPE_LAUNCH_MARKER\" = present ]"],
    );
    assert_eq!(result.unwrap(), Termination::Exited(0));
}
