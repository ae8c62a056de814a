//! imgreg-test - Regression verdict engine
//!
//! Decides whether an image produced by a test matches one of its baseline
//! images within numeric and spatial tolerances:
//!
//! - [`baseline_filenames`] - Discover `base.ext`, `base.1.ext`, `base.2.ext`, ...
//! - [`compare_buffers`] - Count coordinates that match no nearby baseline sample
//! - [`evaluate`] - Compare against every baseline and pick the best match
//! - [`run_suite`] - Evaluate many tests on a sized worker pool
//! - [`DashboardReport`] - Emit CTest/CDash measurements
//!
//! Images are obtained through the [`ImageAccess`] trait.
//! [`FileImageAccess`] decodes files with `imgreg-io`.
//!
//! # Usage
//!
//! ```no_run
//! use imgreg_test::{FileImageAccess, RegressionTest, evaluate};
//!
//! let test = RegressionTest::from_raw("out/seg.png", "baseline/seg.png", 0.0, 10, 1).unwrap();
//! let verdict = evaluate(&test, &FileImageAccess);
//! assert!(verdict.passed);
//! ```

pub mod access;
pub mod baseline;
pub mod compare;
mod error;
mod harness;
mod params;
pub mod report;
pub mod suite;
pub mod verdict;

pub use access::{FileImageAccess, ImageAccess, MemoryImageAccess};
pub use baseline::baseline_filenames;
pub use compare::{NeighborhoodShape, compare_buffers};
pub use error::{Diagnostic, ErrorKind, TestError, TestResult};
pub use harness::RegParams;
pub use params::{DEFAULT_INTENSITY_TOLERANCE, RegressionTest, ToleranceSettings};
pub use report::DashboardReport;
pub use suite::{RejectedTest, SuiteEntry, SuiteOptions, SuiteOutcome, TestOutcome, run_suite};
pub use verdict::{ComparisonResult, Verdict, evaluate, evaluate_with_baselines};
