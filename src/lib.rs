//! Runs a command and reports the resources it consumed.
//!
//! A measured run has four steps, each of which aborts the run on failure:
//!
//! 1. [`cgroup::locate`] maps every accounting subsystem to the cgroup directory of the current
//!    process.
//! 2. [`supervisor::supervise`] runs the command, relaying signals to it, and records wall-clock
//!    and CPU time.
//! 3. [`cgroup::collect`] reads the subsystems' counters once the command has terminated.
//! 4. [`report::Report`] merges both and writes them as JSON.
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

pub mod cgroup;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod mountinfo;
pub mod report;
pub mod supervisor;

pub use config::Config;
pub use error::{Error, FAIL_EXIT_CODE, Result};

/// Measures one run of `program` with `args` and writes the report as configured.
///
/// Returns the exit code the caller should exit with: the child's exit status, or `128 + n` if
/// it was killed by signal `n`.
///
/// # Errors
///
/// Any failure to open the output, discover cgroups, start or wait for the command, read
/// counters or write the report. The output is opened first, so an unusable destination fails
/// before the command runs. No report is written on error.
pub async fn run(config: &Config, program: &OsStr, args: &[OsString]) -> Result<u8> {
    let mut output = config.output.open()?;

    let subsystems = cgroup::locate(&config.proc_root).map_err(Error::Discovery)?;

    let outcome = supervisor::supervise(program, args).await?;

    let cgroups = cgroup::collect(&subsystems).map_err(Error::Stats)?;
    let report = report::Report::assemble(&outcome.timing, cgroups)?;
    report.write_to(&mut output, config.prefix.as_bytes(), config.minified)?;

    Ok(outcome.termination.exit_code())
}
