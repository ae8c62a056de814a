//! Dashboard measurements
//!
//! Writes CTest/CDash `DartMeasurement` tags for suite outcomes. The
//! dashboard picks these up from the test's standard output.
//!
//! For each evaluated test:
//!
//! ```text
//! <DartMeasurement name="ImageError" type="numeric/double">12</DartMeasurement>
//! <DartMeasurement name="BaselineImageName" type="text/string">base.1.png</DartMeasurement>
//! <DartMeasurement name="ImageError 1" type="numeric/double">40</DartMeasurement>
//! <DartMeasurement name="BaselineImageName 1" type="text/string">base.png</DartMeasurement>
//! ...
//! ```
//!
//! Failed tests also get an `ImageCompareFailure` measurement naming the
//! error kind.

use crate::error::{Diagnostic, TestResult};
use crate::suite::{RejectedTest, SuiteOutcome, TestOutcome};
use crate::verdict::Verdict;
use std::borrow::Cow;
use std::io::Write;

/// Marker that keeps CTest from truncating the test log
pub const FULL_OUTPUT_MARKER: &str = "CTEST_FULL_OUTPUT";

const NUMERIC: &str = "numeric/double";
const TEXT: &str = "text/string";

/// Writer of dashboard measurement tags
#[derive(Debug)]
pub struct DashboardReport<W: Write> {
    out: W,
    full_output: bool,
}

impl<W: Write> DashboardReport<W> {
    pub fn new(out: W) -> Self {
        DashboardReport {
            out,
            full_output: false,
        }
    }

    /// Emit [`FULL_OUTPUT_MARKER`] before the measurements
    pub fn with_full_output(mut self, full_output: bool) -> Self {
        self.full_output = full_output;
        self
    }

    /// Write measurements for every outcome of a suite
    pub fn write_suite(&mut self, suite: &SuiteOutcome) -> TestResult<()> {
        if self.full_output {
            writeln!(self.out, "{}", FULL_OUTPUT_MARKER)?;
        }
        for outcome in &suite.outcomes {
            match outcome {
                TestOutcome::Evaluated(verdict) => self.write_verdict(verdict)?,
                TestOutcome::Rejected(rejected) => self.write_rejected(rejected)?,
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Write measurements for one verdict
    pub fn write_verdict(&mut self, verdict: &Verdict) -> TestResult<()> {
        if let Some(chosen) = verdict.chosen_result() {
            match chosen.differing_pixel_count {
                Some(count) => self.measurement("ImageError", NUMERIC, &count.to_string())?,
                None => self.measurement("ImageError", TEXT, "n/a")?,
            }
            self.measurement(
                "BaselineImageName",
                TEXT,
                &chosen.baseline.display().to_string(),
            )?;
        }

        // Per-baseline results only matter when there was a choice
        if verdict.per_baseline_results.len() > 1 {
            for (i, result) in verdict.per_baseline_results.iter().enumerate() {
                let n = i + 1;
                match (&result.differing_pixel_count, &result.error) {
                    (Some(count), _) => {
                        self.measurement(&format!("ImageError {n}"), NUMERIC, &count.to_string())?
                    }
                    (None, Some(err)) => {
                        self.measurement(&format!("ImageError {n}"), TEXT, err.kind.as_str())?
                    }
                    (None, None) => {}
                }
                self.measurement(
                    &format!("BaselineImageName {n}"),
                    TEXT,
                    &result.baseline.display().to_string(),
                )?;
            }
        }

        if !verdict.passed {
            let diagnostic = verdict
                .failure
                .as_ref()
                .or_else(|| verdict.chosen_result().and_then(|r| r.error.as_ref()));
            match diagnostic {
                Some(diagnostic) => self.failure(diagnostic)?,
                None => self.measurement("ImageCompareFailure", TEXT, "TooManyDifferences")?,
            }
        }
        Ok(())
    }

    /// Write the failure measurement of a rejected test
    pub fn write_rejected(&mut self, rejected: &RejectedTest) -> TestResult<()> {
        self.measurement(
            "TestImageName",
            TEXT,
            &rejected.test_image.display().to_string(),
        )?;
        self.failure(&rejected.diagnostic)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn failure(&mut self, diagnostic: &Diagnostic) -> TestResult<()> {
        self.measurement("ImageCompareFailure", TEXT, diagnostic.kind.as_str())?;
        self.measurement("ImageCompareMessage", TEXT, &diagnostic.message)
    }

    fn measurement(&mut self, name: &str, kind: &str, value: &str) -> TestResult<()> {
        writeln!(
            self.out,
            "<DartMeasurement name=\"{}\" type=\"{}\">{}</DartMeasurement>",
            escape(name),
            kind,
            escape(value)
        )?;
        Ok(())
    }
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
