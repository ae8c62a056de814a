//! Multi-baseline verdicts
//!
//! A test passes if its image matches at least one of the baselines found
//! for its template. Every baseline is compared, in parallel, and all
//! results are kept so a report can show how close each one came.

use crate::access::ImageAccess;
use crate::baseline::baseline_filenames;
use crate::compare::compare_buffers;
use crate::error::{Diagnostic, ErrorKind, TestError};
use crate::params::{RegressionTest, ToleranceSettings};
use imgreg_core::PixelBuffer;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of comparing the test image against one baseline
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Baseline file compared against
    pub baseline: PathBuf,
    /// Number of differing coordinates, `None` if the comparison errored
    pub differing_pixel_count: Option<u64>,
    /// Whether the count is within the allowed number of differences
    pub passed: bool,
    /// Why the comparison could not be carried out
    pub error: Option<Diagnostic>,
}

impl ComparisonResult {
    /// A completed comparison
    pub fn counted(baseline: impl Into<PathBuf>, count: u64, settings: &ToleranceSettings) -> Self {
        ComparisonResult {
            baseline: baseline.into(),
            differing_pixel_count: Some(count),
            passed: count <= u64::from(settings.max_number_of_differences()),
            error: None,
        }
    }

    /// A comparison that could not run
    pub fn errored(baseline: impl Into<PathBuf>, error: impl Into<Diagnostic>) -> Self {
        ComparisonResult {
            baseline: baseline.into(),
            differing_pixel_count: None,
            passed: false,
            error: Some(error.into()),
        }
    }
}

/// Final decision for one [`RegressionTest`]
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub test: RegressionTest,
    /// Best matching baseline, set whenever at least one baseline was tried
    pub chosen_baseline: Option<PathBuf>,
    /// One result per baseline, in discovery order
    pub per_baseline_results: Vec<ComparisonResult>,
    pub passed: bool,
    /// Set when the test could not be compared at all
    pub failure: Option<Diagnostic>,
}

impl Verdict {
    /// Build a verdict from per-baseline results
    ///
    /// The chosen baseline is the first result with the smallest count.
    /// Errored results rank after every counted one; if all of them errored
    /// the first baseline is chosen.
    pub fn from_results(test: RegressionTest, results: Vec<ComparisonResult>) -> Self {
        let chosen = results
            .iter()
            .enumerate()
            .min_by_key(|(index, r)| (r.differing_pixel_count.is_none(), r.differing_pixel_count, *index))
            .map(|(_, r)| r.baseline.clone());
        let passed = results.iter().any(|r| r.passed);

        Verdict {
            test,
            chosen_baseline: chosen,
            per_baseline_results: results,
            passed,
            failure: None,
        }
    }

    /// A verdict for a test that found no baseline
    pub fn baseline_not_found(test: RegressionTest) -> Self {
        let failure = Diagnostic::from(TestError::BaselineNotFound {
            template: test.baseline_template().display().to_string(),
        });
        Verdict {
            test,
            chosen_baseline: None,
            per_baseline_results: Vec::new(),
            passed: false,
            failure: Some(failure),
        }
    }

    /// Result for the chosen baseline
    pub fn chosen_result(&self) -> Option<&ComparisonResult> {
        let chosen = self.chosen_baseline.as_deref()?;
        self.per_baseline_results
            .iter()
            .find(|r| r.baseline.as_path() == chosen)
    }

    /// Differing coordinate count of the chosen baseline
    pub fn best_count(&self) -> Option<u64> {
        self.chosen_result()?.differing_pixel_count
    }

    /// Classification of the reason the verdict failed, if any
    ///
    /// Falls back to the chosen result's error when the test itself loaded.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        if self.passed {
            return None;
        }
        self.failure
            .as_ref()
            .or_else(|| self.chosen_result()?.error.as_ref())
            .map(|d| d.kind)
    }
}

/// Discover baselines for `test` and evaluate it
///
/// # Examples
///
/// ```no_run
/// use imgreg_test::{FileImageAccess, RegressionTest, ToleranceSettings, evaluate};
///
/// let test = RegressionTest::new("out.png", "baseline/out.png", ToleranceSettings::default());
/// let verdict = evaluate(&test, &FileImageAccess);
/// println!("passed: {}", verdict.passed);
/// ```
pub fn evaluate(test: &RegressionTest, access: &dyn ImageAccess) -> Verdict {
    let baselines = baseline_filenames(test.baseline_template());
    evaluate_with_baselines(test, &baselines, access)
}

/// Evaluate `test` against an already discovered baseline set
pub fn evaluate_with_baselines(
    test: &RegressionTest,
    baselines: &[PathBuf],
    access: &dyn ImageAccess,
) -> Verdict {
    if baselines.is_empty() {
        warn!(
            template = %test.baseline_template().display(),
            "no baseline image found"
        );
        return Verdict::baseline_not_found(test.clone());
    }

    let test_buffer = match access.load(test.test_image()) {
        Ok(buffer) => buffer,
        Err(err) => {
            warn!(test = %test.test_image().display(), error = %err, "failed to load test image");
            let diagnostic = Diagnostic::from(&err);
            let results = baselines
                .iter()
                .map(|b| ComparisonResult::errored(b, diagnostic.clone()))
                .collect();
            let mut verdict = Verdict::from_results(test.clone(), results);
            verdict.failure = Some(diagnostic);
            return verdict;
        }
    };

    let results: Vec<ComparisonResult> = baselines
        .par_iter()
        .map(|baseline| compare_with_baseline(&test_buffer, baseline, test.settings(), access))
        .collect();

    let verdict = Verdict::from_results(test.clone(), results);
    info!(
        test = %test.test_image().display(),
        passed = verdict.passed,
        baselines = verdict.per_baseline_results.len(),
        best = ?verdict.best_count(),
        "verdict"
    );
    verdict
}

/// Load one baseline and compare the test buffer against it
pub fn compare_with_baseline(
    test_buffer: &PixelBuffer,
    baseline: &Path,
    settings: &ToleranceSettings,
    access: &dyn ImageAccess,
) -> ComparisonResult {
    let outcome = access
        .load(baseline)
        .and_then(|b| compare_buffers(test_buffer, &b, settings));
    match outcome {
        Ok(count) => {
            debug!(baseline = %baseline.display(), count, "compared");
            ComparisonResult::counted(baseline, count, settings)
        }
        Err(err) => {
            warn!(baseline = %baseline.display(), error = %err, "comparison failed");
            ComparisonResult::errored(baseline, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_test() -> RegressionTest {
        RegressionTest::from_raw("t.png", "b.png", 0.0, 1, 0).unwrap()
    }

    fn counted(name: &str, count: u64) -> ComparisonResult {
        ComparisonResult::counted(name, count, sample_test().settings())
    }

    #[test]
    fn test_selection_prefers_smallest_then_first() {
        let results = vec![counted("a", 5), counted("b", 2), counted("c", 2)];
        let verdict = Verdict::from_results(sample_test(), results);
        assert_eq!(verdict.chosen_baseline.as_deref(), Some(Path::new("b")));
        assert!(!verdict.passed);
        assert_eq!(verdict.best_count(), Some(2));
    }

    #[test]
    fn test_errored_results_rank_last() {
        let diag = Diagnostic {
            kind: ErrorKind::DimensionMismatch,
            message: "mismatch".to_string(),
        };
        let results = vec![ComparisonResult::errored("a", diag.clone()), counted("b", 9)];
        let verdict = Verdict::from_results(sample_test(), results);
        assert_eq!(verdict.chosen_baseline.as_deref(), Some(Path::new("b")));

        let all_errored = vec![
            ComparisonResult::errored("x", diag.clone()),
            ComparisonResult::errored("y", diag),
        ];
        let verdict = Verdict::from_results(sample_test(), all_errored);
        assert_eq!(verdict.chosen_baseline.as_deref(), Some(Path::new("x")));
        assert_eq!(verdict.failure_kind(), Some(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_passes_if_any_passes() {
        let results = vec![counted("a", 0), counted("b", 7)];
        let verdict = Verdict::from_results(sample_test(), results);
        assert!(verdict.passed);
        assert_eq!(verdict.failure_kind(), None);
    }

    #[test]
    fn test_empty_baseline_set() {
        struct Nothing;
        impl ImageAccess for Nothing {
            fn load(&self, path: &Path) -> crate::TestResult<PixelBuffer> {
                Err(TestError::ImageLoad {
                    path: path.display().to_string(),
                    message: "unused".to_string(),
                })
            }
        }
        let verdict = evaluate_with_baselines(&sample_test(), &[], &Nothing);
        assert!(!verdict.passed);
        assert!(verdict.per_baseline_results.is_empty());
        assert_eq!(verdict.chosen_baseline, None);
        assert_eq!(verdict.failure_kind(), Some(ErrorKind::BaselineNotFound));
    }
}
