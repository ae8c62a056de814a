//! Suite regression test
//!
//! Tests running several comparisons together: order of outcomes, thread
//! count independence, and isolation of rejected tests.

use imgreg_core::PixelBuffer;
use imgreg_test::{
    DashboardReport, ErrorKind, MemoryImageAccess, RegParams, RegressionTest, RejectedTest,
    SuiteEntry, SuiteOptions, TestError, TestOutcome, ToleranceSettings, run_suite,
};

fn ramp(offset: f64) -> PixelBuffer {
    let data = (0..16).map(|v| f64::from(v) + offset).collect();
    PixelBuffer::from_2d(4, 4, data).unwrap()
}

fn access() -> MemoryImageAccess {
    MemoryImageAccess::new()
        .with("out/a", ramp(0.0))
        .with("out/b", ramp(3.0))
        .with("base/a", ramp(0.0))
        .with("base/b", ramp(0.0))
}

fn entries() -> Vec<SuiteEntry> {
    let tolerant = ToleranceSettings::new(5.0, 0, 0).unwrap();
    let strict = ToleranceSettings::new(1.0, 0, 0).unwrap();
    let rejected = ToleranceSettings::new(-1.0, 0, 0).unwrap_err();
    vec![
        Ok(RegressionTest::new("out/a", "base/a", strict)),
        Ok(RegressionTest::new("out/b", "base/b", tolerant)),
        Ok(RegressionTest::new("out/b", "base/b", strict)),
        Err(RejectedTest::new("out/a", "base/a", &rejected)),
    ]
}

// ==========================================================================
// Test 1: Outcomes in order
// ==========================================================================

#[test]
fn suite_reg_outcomes() {
    let mut rp = RegParams::new("suite_outcomes");

    let outcome = run_suite(&entries(), &access(), &SuiteOptions::default()).unwrap();
    rp.compare_values(4.0, outcome.outcomes.len() as f64, 0.0);
    let passed: Vec<bool> = outcome.outcomes.iter().map(TestOutcome::passed).collect();
    rp.compare_values(1.0, if passed == [true, true, false, false] { 1.0 } else { 0.0 }, 0.0);
    rp.compare_values(0.0, if outcome.passed() { 1.0 } else { 0.0 }, 0.0);
    rp.compare_values(2.0, outcome.failed_count() as f64, 0.0);
    rp.compare_values(3.0, outcome.verdicts().count() as f64, 0.0);

    if let TestOutcome::Rejected(rejected) = &outcome.outcomes[3] {
        let is_config = rejected.diagnostic.kind == ErrorKind::InvalidToleranceConfig;
        rp.compare_values(1.0, if is_config { 1.0 } else { 0.0 }, 0.0);
    } else {
        rp.compare_values(1.0, 0.0, 0.0);
    }

    assert!(rp.cleanup(), "suite_reg outcome tests failed");
}

// ==========================================================================
// Test 2: Thread count does not change results
// ==========================================================================

#[test]
fn suite_reg_thread_counts() {
    let mut rp = RegParams::new("suite_threads");

    let entries = entries();
    let access = access();
    let reference = run_suite(&entries, &access, &SuiteOptions { max_threads: 1 }).unwrap();
    for threads in [0, 2, 8] {
        let outcome =
            run_suite(&entries, &access, &SuiteOptions { max_threads: threads }).unwrap();
        rp.compare_values(1.0, if outcome == reference { 1.0 } else { 0.0 }, 0.0);
    }

    assert!(rp.cleanup(), "suite_reg thread count tests failed");
}

// ==========================================================================
// Test 3: Dashboard output for a suite
// ==========================================================================

#[test]
fn suite_reg_dashboard() {
    let mut rp = RegParams::new("suite_dashboard");

    let outcome = run_suite(&entries(), &access(), &SuiteOptions::default()).unwrap();
    let mut report = DashboardReport::new(Vec::new()).with_full_output(true);
    report.write_suite(&outcome).unwrap();
    let text = String::from_utf8(report.into_inner()).unwrap();

    rp.compare_values(1.0, if text.starts_with("CTEST_FULL_OUTPUT") { 1.0 } else { 0.0 }, 0.0);
    let image_errors = text.matches("name=\"ImageError\"").count();
    rp.compare_values(3.0, image_errors as f64, 0.0);
    let failures = text.matches("name=\"ImageCompareFailure\"").count();
    rp.compare_values(2.0, failures as f64, 0.0);

    let err = TestError::InvalidToleranceConfig("x".to_string());
    rp.compare_strings(b"InvalidToleranceConfig", err.kind().as_str().as_bytes());

    assert!(rp.cleanup(), "suite_reg dashboard tests failed");
}
