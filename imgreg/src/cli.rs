//! Command-line intake
//!
//! Tolerance options are positional in effect: each one applies to the
//! `--compare` options that follow it on the command line.
//!
//! ```text
//! imgreg-testdriver --intensity-tolerance 0 --compare a.png base/a.png \
//!                   --tolerance-radius 1   --compare b.png base/b.png \
//!                   -- ./my_test --output-dir .
//! ```
//!
//! Here `a.png` is compared with radius 0 and `b.png` with intensity
//! tolerance 0 and radius 1.

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use imgreg_test::{
    DEFAULT_INTENSITY_TOLERANCE, NeighborhoodShape, RegressionTest, RejectedTest, SuiteEntry,
    TestError, TestResult, ToleranceSettings,
};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::debug;

/// Command-line arguments of `imgreg-testdriver`
#[derive(Parser, Debug, Clone)]
#[command(
    name = "imgreg-testdriver",
    version,
    about = "Run a test command, then compare the images it produced against baselines"
)]
pub struct Args {
    /// Compare the <TEST> image to the <BASELINE> image using the current
    /// tolerances. Further baselines are found as BASELINE with a numeric
    /// suffix before the extension (base.nii, base.1.nii, base.2.nii, ...)
    #[arg(long, num_args = 2, value_names = ["TEST", "BASELINE"], action = ArgAction::Append)]
    pub compare: Vec<PathBuf>,

    /// Accepted maximum intensity difference for the following comparisons
    /// (default: 2.0)
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true, action = ArgAction::Append)]
    pub intensity_tolerance: Vec<f64>,

    /// Number of image elements allowed to differ in the following comparisons
    #[arg(
        long,
        value_name = "N",
        allow_negative_numbers = true,
        value_parser = parse_count,
        action = ArgAction::Append
    )]
    pub max_number_of_differences: Vec<CountArg>,

    /// Neighborhood radius searched for a matching baseline element in the
    /// following comparisons
    #[arg(
        long,
        value_name = "N",
        allow_negative_numbers = true,
        value_parser = parse_count,
        action = ArgAction::Append
    )]
    pub tolerance_radius: Vec<CountArg>,

    /// Neighborhood shape for the following comparisons: cube or ball
    #[arg(long, value_name = "SHAPE", action = ArgAction::Append)]
    pub neighborhood: Vec<NeighborhoodShape>,

    /// Prepend a directory to the test's library search path
    #[arg(long, value_name = "DIR", action = ArgAction::Append)]
    pub add_before_libpath: Vec<OsString>,

    /// Prepend <VALUE> to the test's environment variable <NAME> using the
    /// platform path separator
    #[arg(long, num_args = 2, value_names = ["NAME", "VALUE"], action = ArgAction::Append)]
    pub add_before_env: Vec<OsString>,

    /// Prepend <VALUE> to the test's environment variable <NAME> using <SEP>
    #[arg(long, num_args = 3, value_names = ["NAME", "VALUE", "SEP"], action = ArgAction::Append)]
    pub add_before_env_with_sep: Vec<OsString>,

    /// Redirect the test's standard output to a file
    #[arg(long, value_name = "FILE")]
    pub redirect_output: Option<PathBuf>,

    /// Use at most N threads for the regression tests (0: all cores)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub max_number_of_threads: usize,

    /// Pass the full test output to CDash
    #[arg(long)]
    pub full_output: bool,

    /// Increase verbosity of log messages
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not run a test command, only the regression tests
    #[arg(long)]
    pub noprocess: bool,

    /// The test command and its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<OsString>,
}

/// Integer value of a count option
///
/// Text that is not an integer is a usage error. An integer too large for
/// `i64` is kept as text so that it rejects the following comparisons
/// like any other out-of-range tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountArg {
    Value(i64),
    OutOfRange(String),
}

impl CountArg {
    fn resolve(&self, what: &str) -> TestResult<i64> {
        match self {
            CountArg::Value(v) => Ok(*v),
            CountArg::OutOfRange(text) => Err(TestError::InvalidToleranceConfig(format!(
                "{} out of range, got {}",
                what, text
            ))),
        }
    }
}

impl From<i64> for CountArg {
    fn from(value: i64) -> Self {
        CountArg::Value(value)
    }
}

fn parse_count(text: &str) -> Result<CountArg, String> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not an integer", text));
    }
    Ok(text
        .parse::<i64>()
        .map_or_else(|_| CountArg::OutOfRange(text.to_string()), CountArg::Value))
}

/// A parsed command line
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Args,
    /// One entry per `--compare`, in command-line order
    pub entries: Vec<SuiteEntry>,
}

/// Parse the process command line
pub fn parse() -> Result<Invocation, clap::Error> {
    parse_from(std::env::args_os())
}

/// Parse a command line
///
/// # Errors
///
/// Returns a clap error for malformed options and when neither a test
/// command nor `--noprocess` is given. Invalid tolerance values are not
/// errors here; they reject the affected comparisons.
pub fn parse_from<I, T>(itr: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Args::command();
    let matches = command.try_get_matches_from_mut(itr)?;
    let args = Args::from_arg_matches(&matches)?;

    if !args.noprocess && args.command.is_empty() {
        return Err(command.error(
            clap::error::ErrorKind::MissingRequiredArgument,
            "a test command is required unless --noprocess is given",
        ));
    }

    let entries = intake(intake_events(&args, &matches));
    debug!(comparisons = entries.len(), "parsed command line");
    Ok(Invocation { args, entries })
}

/// One tolerance change or comparison request
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeEvent {
    IntensityTolerance(f64),
    MaxNumberOfDifferences(CountArg),
    ToleranceRadius(CountArg),
    Neighborhood(NeighborhoodShape),
    Compare { test: PathBuf, baseline: PathBuf },
}

/// Order the tolerance and comparison options by command-line position
fn intake_events(args: &Args, matches: &ArgMatches) -> Vec<IntakeEvent> {
    fn positions(matches: &ArgMatches, id: &str) -> Vec<usize> {
        matches
            .indices_of(id)
            .map(|indices| indices.collect())
            .unwrap_or_default()
    }

    let mut events: Vec<(usize, IntakeEvent)> = Vec::new();
    for (&i, &v) in positions(matches, "intensity_tolerance")
        .iter()
        .zip(&args.intensity_tolerance)
    {
        events.push((i, IntakeEvent::IntensityTolerance(v)));
    }
    for (&i, v) in positions(matches, "max_number_of_differences")
        .iter()
        .zip(&args.max_number_of_differences)
    {
        events.push((i, IntakeEvent::MaxNumberOfDifferences(v.clone())));
    }
    for (&i, v) in positions(matches, "tolerance_radius")
        .iter()
        .zip(&args.tolerance_radius)
    {
        events.push((i, IntakeEvent::ToleranceRadius(v.clone())));
    }
    for (&i, &v) in positions(matches, "neighborhood").iter().zip(&args.neighborhood) {
        events.push((i, IntakeEvent::Neighborhood(v)));
    }
    // Two values per --compare; the first value's index orders the pair
    let compare_positions = positions(matches, "compare");
    for (idx, pair) in compare_positions
        .chunks_exact(2)
        .zip(args.compare.chunks_exact(2))
    {
        events.push((
            idx[0],
            IntakeEvent::Compare {
                test: pair[0].clone(),
                baseline: pair[1].clone(),
            },
        ));
    }

    events.sort_by_key(|(index, _)| *index);
    events.into_iter().map(|(_, event)| event).collect()
}

/// Fold intake events into suite entries
///
/// Tolerance values are validated at each comparison, so an invalid value
/// rejects only the comparisons that follow it, until it is replaced.
///
/// ```
/// use imgreg::cli::{IntakeEvent, intake};
///
/// let entries = intake([
///     IntakeEvent::IntensityTolerance(-1.0),
///     IntakeEvent::Compare { test: "a".into(), baseline: "b".into() },
///     IntakeEvent::IntensityTolerance(0.5),
///     IntakeEvent::Compare { test: "c".into(), baseline: "d".into() },
/// ]);
/// assert!(entries[0].is_err());
/// assert!(entries[1].is_ok());
/// ```
pub fn intake(events: impl IntoIterator<Item = IntakeEvent>) -> Vec<SuiteEntry> {
    let mut intensity = DEFAULT_INTENSITY_TOLERANCE;
    let mut max_differences = CountArg::Value(0);
    let mut radius = CountArg::Value(0);
    let mut neighborhood = NeighborhoodShape::default();
    let mut entries = Vec::new();

    for event in events {
        match event {
            IntakeEvent::IntensityTolerance(v) => intensity = v,
            IntakeEvent::MaxNumberOfDifferences(v) => max_differences = v,
            IntakeEvent::ToleranceRadius(v) => radius = v,
            IntakeEvent::Neighborhood(v) => neighborhood = v,
            IntakeEvent::Compare { test, baseline } => {
                let settings = max_differences
                    .resolve("max number of differences")
                    .and_then(|n| {
                        let r = radius.resolve("tolerance radius")?;
                        ToleranceSettings::new(intensity, n, r)
                    });
                let entry = match settings {
                    Ok(settings) => Ok(RegressionTest::new(
                        test,
                        baseline,
                        settings.with_neighborhood(neighborhood),
                    )),
                    Err(err) => Err(RejectedTest::new(test, baseline, &err)),
                };
                entries.push(entry);
            }
        }
    }
    entries
}

/// Name of the platform's shared library search path variable
pub fn libpath_variable() -> &'static str {
    if cfg!(windows) {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Platform separator for path-list environment variables
pub fn path_separator() -> &'static str {
    if cfg!(windows) { ";" } else { ":" }
}

/// Environment of the test subprocess, as changes to the inherited one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    vars: Vec<(OsString, OsString)>,
}

impl EnvOverrides {
    /// Collect the `--add-before-*` options
    ///
    /// `base` looks up a variable in the inherited environment. Library
    /// paths are applied first, then `--add-before-env`, then
    /// `--add-before-env-with-sep`, each in command-line order. Every
    /// prepend goes in front of the previous value.
    pub fn from_args(args: &Args, base: impl Fn(&OsStr) -> Option<OsString>) -> Self {
        let mut overrides = EnvOverrides::default();
        for dir in &args.add_before_libpath {
            overrides.prepend(libpath_variable(), dir, path_separator(), &base);
        }
        for pair in args.add_before_env.chunks_exact(2) {
            overrides.prepend(&pair[0], &pair[1], path_separator(), &base);
        }
        for triple in args.add_before_env_with_sep.chunks_exact(3) {
            overrides.prepend(&triple[0], &triple[1], &triple[2], &base);
        }
        overrides
    }

    /// Prepend `value` to `name`, separated by `sep` from any current value
    pub fn prepend(
        &mut self,
        name: impl AsRef<OsStr>,
        value: impl AsRef<OsStr>,
        sep: impl AsRef<OsStr>,
        base: impl Fn(&OsStr) -> Option<OsString>,
    ) {
        let name = name.as_ref();
        let current = self.get(name).map(OsStr::to_os_string).or_else(|| base(name));

        let mut combined = value.as_ref().to_os_string();
        if let Some(current) = current.filter(|c| !c.is_empty()) {
            combined.push(sep.as_ref());
            combined.push(current);
        }

        match self.vars.iter_mut().find(|(n, _)| n.as_os_str() == name) {
            Some((_, v)) => *v = combined,
            None => self.vars.push((name.to_os_string(), combined)),
        }
    }

    pub fn get(&self, name: impl AsRef<OsStr>) -> Option<&OsStr> {
        let name = name.as_ref();
        self.vars
            .iter()
            .find(|(n, _)| n.as_os_str() == name)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(n, v)| (n.as_os_str(), v.as_os_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgreg_test::ErrorKind;

    fn parse_ok(args: &[&str]) -> Invocation {
        parse_from(std::iter::once("imgreg-testdriver").chain(args.iter().copied())).unwrap()
    }

    fn no_env(_: &OsStr) -> Option<OsString> {
        None
    }

    #[test]
    fn test_tolerances_apply_to_following_compares() {
        let inv = parse_ok(&[
            "--noprocess",
            "--compare",
            "a.png",
            "base/a.png",
            "--intensity-tolerance",
            "0.5",
            "--max-number-of-differences",
            "3",
            "--compare",
            "b.png",
            "base/b.png",
            "--tolerance-radius",
            "2",
            "--neighborhood",
            "ball",
            "--compare",
            "c.png",
            "base/c.png",
        ]);
        assert_eq!(inv.entries.len(), 3);
        let tests: Vec<_> = inv.entries.iter().map(|e| e.as_ref().unwrap()).collect();

        let s = tests[0].settings();
        assert_eq!(s.intensity_tolerance(), 2.0);
        assert_eq!(s.max_number_of_differences(), 0);

        let s = tests[1].settings();
        assert_eq!(s.intensity_tolerance(), 0.5);
        assert_eq!(s.max_number_of_differences(), 3);
        assert_eq!(s.tolerance_radius(), 0);

        let s = tests[2].settings();
        assert_eq!(s.tolerance_radius(), 2);
        assert_eq!(s.neighborhood(), NeighborhoodShape::Ball);
        assert_eq!(tests[2].test_image(), std::path::Path::new("c.png"));
        assert_eq!(tests[2].baseline_template(), std::path::Path::new("base/c.png"));
    }

    #[test]
    fn test_negative_tolerance_rejects_only_following() {
        let inv = parse_ok(&[
            "--noprocess",
            "--compare",
            "a",
            "b",
            "--intensity-tolerance",
            "-1",
            "--compare",
            "c",
            "d",
            "--intensity-tolerance",
            "1",
            "--compare",
            "e",
            "f",
        ]);
        assert!(inv.entries[0].is_ok());
        let rejected = inv.entries[1].as_ref().unwrap_err();
        assert_eq!(rejected.diagnostic.kind, ErrorKind::InvalidToleranceConfig);
        assert_eq!(rejected.test_image, PathBuf::from("c"));
        assert!(inv.entries[2].is_ok());
    }

    #[test]
    fn test_oversized_count_rejects_only_following() {
        let inv = parse_ok(&[
            "--noprocess",
            "--compare",
            "a",
            "b",
            "--max-number-of-differences",
            "99999999999999999999",
            "--compare",
            "c",
            "d",
            "--tolerance-radius",
            "-99999999999999999999",
            "--max-number-of-differences",
            "4",
            "--compare",
            "e",
            "f",
            "--tolerance-radius",
            "+1",
            "--compare",
            "g",
            "h",
        ]);
        assert_eq!(inv.entries.len(), 4);
        assert!(inv.entries[0].is_ok());
        for (i, test_image) in [(1, "c"), (2, "e")] {
            let rejected = inv.entries[i].as_ref().unwrap_err();
            assert_eq!(rejected.diagnostic.kind, ErrorKind::InvalidToleranceConfig);
            assert_eq!(rejected.test_image, PathBuf::from(test_image));
        }
        let s = inv.entries[3].as_ref().unwrap().settings();
        assert_eq!(s.max_number_of_differences(), 4);
        assert_eq!(s.tolerance_radius(), 1);
    }

    #[test]
    fn test_command_required_without_noprocess() {
        let err = parse_from(["imgreg-testdriver", "--compare", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_trailing_command() {
        let inv = parse_ok(&["--compare", "a", "b", "--", "./run", "--flag", "-x"]);
        assert_eq!(inv.args.command, ["./run", "--flag", "-x"]);
        assert!(!inv.args.noprocess);
    }

    #[test]
    fn test_malformed_values_are_usage_errors() {
        assert!(parse_from(["d", "--noprocess", "--intensity-tolerance", "abc"]).is_err());
        assert!(parse_from(["d", "--noprocess", "--compare", "only-one"]).is_err());
        assert!(parse_from(["d", "--noprocess", "--neighborhood", "sphere"]).is_err());
        assert!(parse_from(["d", "--noprocess", "--tolerance-radius", "1.5"]).is_err());
        assert!(parse_from(["d", "--noprocess", "--max-number-of-differences", "-"]).is_err());
    }

    #[test]
    fn test_env_overrides_prepend() {
        let inv = parse_ok(&[
            "--noprocess",
            "--add-before-env",
            "FOO",
            "one",
            "--add-before-env",
            "FOO",
            "two",
            "--add-before-env-with-sep",
            "BAR",
            "x",
            ",",
        ]);
        let base = |name: &OsStr| (name == "BAR").then(|| OsString::from("y"));
        let env = EnvOverrides::from_args(&inv.args, base);
        let sep = path_separator();
        assert_eq!(env.get("FOO").unwrap(), OsString::from(format!("two{sep}one")).as_os_str());
        assert_eq!(env.get("BAR").unwrap(), OsStr::new("x,y"));
    }

    #[test]
    fn test_libpath_override() {
        let inv = parse_ok(&["--noprocess", "--add-before-libpath", "/opt/lib"]);
        let env = EnvOverrides::from_args(&inv.args, no_env);
        assert_eq!(env.get(libpath_variable()).unwrap(), OsStr::new("/opt/lib"));
        assert_eq!(env.iter().count(), 1);
    }

    #[test]
    fn test_intake_without_compares() {
        assert!(intake([IntakeEvent::ToleranceRadius((-4).into())]).is_empty());
    }
}
