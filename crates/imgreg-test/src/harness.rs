//! Check accumulator for regression tests
//!
//! [`RegParams`] records the outcome of a sequence of numbered checks and
//! reports all failures at the end instead of aborting on the first one.
//!
//! ```
//! use imgreg_test::RegParams;
//!
//! let mut rp = RegParams::new("example");
//! rp.compare_values(4.0, 2.0 + 2.0, 0.0);
//! assert!(rp.cleanup());
//! ```

use crate::compare::compare_buffers;
use crate::params::ToleranceSettings;
use crate::verdict::Verdict;
use imgreg_core::PixelBuffer;

/// Regression test parameters
///
/// Tracks the test name, the index of the current check, and the failures
/// recorded so far.
pub struct RegParams {
    /// Name of the test (e.g., "baseline")
    pub test_name: String,
    /// Current check index (incremented before each check)
    index: usize,
    success: bool,
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters
    pub fn new(test_name: &str) -> Self {
        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");

        Self {
            test_name: test_name.to_string(),
            index: 0,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current check index
    pub fn index(&self) -> usize {
        self.index
    }

    fn fail(&mut self, msg: String) -> bool {
        eprintln!("{}", msg);
        self.failures.push(msg);
        self.success = false;
        false
    }

    /// Compare two floating-point values
    ///
    /// Returns `true` if `actual` lies within `delta` of `expected`.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();

        if diff > delta || diff.is_nan() {
            let msg = format!(
                "Failure in {}_reg: value comparison for index {}\n\
                 difference = {} but allowed delta = {}\n\
                 expected = {}, actual = {}",
                self.test_name, self.index, diff, delta, expected, actual
            );
            self.fail(msg)
        } else {
            true
        }
    }

    /// Check that two buffers are identical
    ///
    /// Samples are compared with zero tolerance; NaNs at the same
    /// coordinate count as equal.
    pub fn compare_buffers(&mut self, expected: &PixelBuffer, actual: &PixelBuffer) -> bool {
        self.index += 1;
        match compare_buffers(actual, expected, &ToleranceSettings::exact()) {
            Ok(0) => true,
            Ok(count) => {
                let msg = format!(
                    "Failure in {}_reg: buffer comparison for index {} - {} coordinates differ",
                    self.test_name, self.index, count
                );
                self.fail(msg)
            }
            Err(err) => {
                let msg = format!(
                    "Failure in {}_reg: buffer comparison for index {} - {}",
                    self.test_name, self.index, err
                );
                self.fail(msg)
            }
        }
    }

    /// Check that a verdict passed or failed as expected
    pub fn compare_verdict(&mut self, expected_pass: bool, verdict: &Verdict) -> bool {
        self.index += 1;
        if verdict.passed == expected_pass {
            return true;
        }
        let msg = format!(
            "Failure in {}_reg: verdict for index {} - expected {}, got {} \
             (test {}, best count {:?}, failure {:?})",
            self.test_name,
            self.index,
            if expected_pass { "pass" } else { "fail" },
            if verdict.passed { "pass" } else { "fail" },
            verdict.test.test_image().display(),
            verdict.best_count(),
            verdict.failure.as_ref().map(|d| d.kind),
        );
        self.fail(msg)
    }

    /// Compare two binary data arrays
    pub fn compare_strings(&mut self, data1: &[u8], data2: &[u8]) -> bool {
        self.index += 1;

        if data1 != data2 {
            let msg = format!(
                "Failure in {}_reg: string comparison for index {}\n\
                 sizes: {} vs {}",
                self.test_name,
                self.index,
                data1.len(),
                data2.len()
            );
            self.fail(msg)
        } else {
            true
        }
    }

    /// Clean up and report results
    ///
    /// Returns `true` if all checks passed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all checks have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}
