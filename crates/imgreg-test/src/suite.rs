//! Suite execution
//!
//! Runs every requested comparison of one driver invocation. Tests are
//! independent, so they are evaluated in parallel on a dedicated pool whose
//! size the caller chooses. Outcomes keep the order of the input.

use crate::access::ImageAccess;
use crate::error::{Diagnostic, TestError, TestResult};
use crate::params::RegressionTest;
use crate::verdict::{Verdict, evaluate};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// A `--compare` request whose parameters failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTest {
    pub test_image: PathBuf,
    pub baseline_template: PathBuf,
    pub diagnostic: Diagnostic,
}

impl RejectedTest {
    pub fn new(
        test_image: impl Into<PathBuf>,
        baseline_template: impl Into<PathBuf>,
        error: &TestError,
    ) -> Self {
        RejectedTest {
            test_image: test_image.into(),
            baseline_template: baseline_template.into(),
            diagnostic: Diagnostic::from(error),
        }
    }
}

/// One entry produced by argument intake
pub type SuiteEntry = Result<RegressionTest, RejectedTest>;

/// Suite execution options
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteOptions {
    /// Worker threads; 0 uses the global pool, 1 runs serially
    pub max_threads: usize,
}

/// Result of one suite entry
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Evaluated(Verdict),
    Rejected(RejectedTest),
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        match self {
            TestOutcome::Evaluated(verdict) => verdict.passed,
            TestOutcome::Rejected(_) => false,
        }
    }
}

/// Outcomes of a whole suite, in input order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuiteOutcome {
    pub outcomes: Vec<TestOutcome>,
}

impl SuiteOutcome {
    /// True iff every test was accepted and passed
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(TestOutcome::passed)
    }

    /// Number of failed or rejected tests
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.outcomes.iter().filter_map(|o| match o {
            TestOutcome::Evaluated(verdict) => Some(verdict),
            TestOutcome::Rejected(_) => None,
        })
    }
}

/// Evaluate all suite entries
///
/// # Errors
///
/// Returns `TestError::ThreadPool` if a dedicated pool was requested and
/// could not be created. Test failures never produce an error.
pub fn run_suite(
    entries: &[SuiteEntry],
    access: &dyn ImageAccess,
    options: &SuiteOptions,
) -> TestResult<SuiteOutcome> {
    let run = || -> Vec<TestOutcome> {
        entries
            .par_iter()
            .map(|entry| match entry {
                Ok(test) => TestOutcome::Evaluated(evaluate(test, access)),
                Err(rejected) => TestOutcome::Rejected(rejected.clone()),
            })
            .collect()
    };

    let outcomes = if options.max_threads == 0 {
        run()
    } else {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.max_threads)
            .build()
            .map_err(|e| TestError::ThreadPool(e.to_string()))?;
        debug!(threads = options.max_threads, "dedicated suite pool");
        pool.install(run)
    };

    let outcome = SuiteOutcome { outcomes };
    info!(
        tests = entries.len(),
        failed = outcome.failed_count(),
        "suite finished"
    );
    Ok(outcome)
}
