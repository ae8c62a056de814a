//! Test driver
//!
//! Runs the test command with its environment adjusted, then evaluates the
//! requested comparisons and writes dashboard measurements to stdout.
//!
//! # Exit codes
//!
//! | code | meaning |
//! |---|---|
//! | 0 | every comparison passed |
//! | 1 | a comparison failed or was rejected, or the test was killed by a signal |
//! | 2 | usage error, or the test command could not be started |
//! | other | exit code of a failing test command; comparisons are skipped |

use crate::cli::{EnvOverrides, Invocation};
use anyhow::{Context, Result};
use imgreg_test::{DashboardReport, ImageAccess, SuiteOptions, run_suite};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

/// All comparisons passed
pub const EXIT_SUCCESS: i32 = 0;
/// At least one comparison failed
pub const EXIT_FAILURE: i32 = 1;
/// Usage error or test command not started
pub const EXIT_USAGE: i32 = 2;

/// Run an invocation against the real environment and filesystem
///
/// Measurements go to `out`.
pub fn run(invocation: &Invocation, access: &dyn ImageAccess, out: impl Write) -> i32 {
    match try_run(invocation, access, out) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            EXIT_USAGE
        }
    }
}

fn try_run(invocation: &Invocation, access: &dyn ImageAccess, out: impl Write) -> Result<i32> {
    let args = &invocation.args;

    if !args.noprocess {
        let env = EnvOverrides::from_args(args, |name| std::env::var_os(name));
        let code = run_test_command(&args.command, &env, args.redirect_output.as_deref())?;
        if code != EXIT_SUCCESS {
            warn!(code, "test command failed, skipping regression tests");
            return Ok(code);
        }
    }

    let options = SuiteOptions {
        max_threads: args.max_number_of_threads,
    };
    let outcome = run_suite(&invocation.entries, access, &options)?;

    let mut report = DashboardReport::new(out).with_full_output(args.full_output);
    report
        .write_suite(&outcome)
        .context("failed to write dashboard measurements")?;

    if outcome.passed() {
        info!(tests = outcome.outcomes.len(), "all regression tests passed");
        Ok(EXIT_SUCCESS)
    } else {
        info!(
            failed = outcome.failed_count(),
            tests = outcome.outcomes.len(),
            "regression tests failed"
        );
        Ok(EXIT_FAILURE)
    }
}

/// Spawn the test command and wait for it
///
/// Returns the command's exit code; termination by a signal counts as
/// [`EXIT_FAILURE`].
///
/// # Errors
///
/// Fails if the command is empty, cannot be started, or the redirect file
/// cannot be created.
pub fn run_test_command(
    command: &[OsString],
    env: &EnvOverrides,
    redirect_output: Option<&std::path::Path>,
) -> Result<i32> {
    let (program, rest) = command
        .split_first()
        .context("no test command given")?;

    let mut child = Command::new(program);
    child.args(rest);
    for (name, value) in env.iter() {
        debug!(name = %name.to_string_lossy(), value = %value.to_string_lossy(), "test environment");
        child.env(name, value);
    }
    if let Some(path) = redirect_output {
        let file = File::create(path)
            .with_context(|| format!("failed to create output file '{}'", path.display()))?;
        child.stdout(Stdio::from(file));
    }

    info!(command = %program.to_string_lossy(), args = rest.len(), "running test");
    let status = child
        .status()
        .with_context(|| format!("failed to run test command '{}'", program.to_string_lossy()))?;

    Ok(match status.code() {
        Some(code) => code,
        None => {
            warn!(%status, "test command terminated without exit code");
            EXIT_FAILURE
        }
    })
}
