use std::ffi::OsString;
use std::process::ExitCode;

use cgroup_stats::{Config, FAIL_EXIT_CODE, config};

/// Entry point for `cgroup-stats`.
///
/// Runs `<command> [arg...]`, then writes its wall-clock time, CPU time and the counters of the
/// cgroups it ran in as JSON, and exits with the command's exit code.
///
/// # Examples
///
/// ```bash
/// STATS_OUTPUT_FILE=stats.json STATS_OUTPUT_MINIFIED=true cgroup-stats make -j8
/// ```
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args_os();
    let argv0 = args
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());
    let Some(program) = args.next() else {
        print!("{}", config::usage(&argv0));
        return ExitCode::from(FAIL_EXIT_CODE);
    };
    let args: Vec<OsString> = args.collect();

    let config = Config::from_env();
    match cgroup_stats::run(&config, &program, &args).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{argv0}: {err}");
            ExitCode::from(FAIL_EXIT_CODE)
        }
    }
}
