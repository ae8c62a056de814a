//! # imgreg-testdriver
//!
//! Runs a test command, then compares the images it produced against
//! baseline images and reports the results as CTest/CDash measurements.

use imgreg::cli;
use imgreg::driver;
use imgreg::FileImageAccess;
use tracing_subscriber::EnvFilter;

fn main() {
    let invocation = match cli::parse() {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };

    // Initialize logging
    let level = match invocation.args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let code = driver::run(&invocation, &FileImageAccess, std::io::stdout().lock());
    std::process::exit(code);
}
