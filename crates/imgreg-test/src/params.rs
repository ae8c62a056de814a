//! Regression test parameters
//!
//! A [`RegressionTest`] pairs a test image with a baseline template and the
//! tolerances in effect for that comparison. Values are validated once, at
//! construction, so the verdict engine never sees an out-of-range setting.

use crate::compare::NeighborhoodShape;
use crate::error::{TestError, TestResult};
use std::path::{Path, PathBuf};

/// Default accepted intensity difference
pub const DEFAULT_INTENSITY_TOLERANCE: f64 = 2.0;

/// Tolerances applied to one image comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceSettings {
    intensity_tolerance: f64,
    max_number_of_differences: u32,
    tolerance_radius: u32,
    neighborhood: NeighborhoodShape,
}

impl Default for ToleranceSettings {
    fn default() -> Self {
        ToleranceSettings {
            intensity_tolerance: DEFAULT_INTENSITY_TOLERANCE,
            max_number_of_differences: 0,
            tolerance_radius: 0,
            neighborhood: NeighborhoodShape::Cube,
        }
    }
}

impl ToleranceSettings {
    /// Settings that accept no difference at all
    pub fn exact() -> Self {
        ToleranceSettings {
            intensity_tolerance: 0.0,
            ..ToleranceSettings::default()
        }
    }

    /// Validate raw tolerance values
    ///
    /// Counts are taken as signed integers so that negative input can be
    /// reported instead of wrapping.
    ///
    /// # Errors
    ///
    /// Returns `TestError::InvalidToleranceConfig` if `intensity_tolerance`
    /// is negative or not finite, or if either count is negative or does not
    /// fit in 32 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use imgreg_test::ToleranceSettings;
    ///
    /// let settings = ToleranceSettings::new(0.5, 10, 1).unwrap();
    /// assert_eq!(settings.tolerance_radius(), 1);
    /// assert!(ToleranceSettings::new(-1.0, 0, 0).is_err());
    /// ```
    pub fn new(
        intensity_tolerance: f64,
        max_number_of_differences: i64,
        tolerance_radius: i64,
    ) -> TestResult<Self> {
        ToleranceSettings::default()
            .with_intensity_tolerance(intensity_tolerance)?
            .with_max_number_of_differences(max_number_of_differences)?
            .with_tolerance_radius(tolerance_radius)
    }

    /// Replace the intensity tolerance
    pub fn with_intensity_tolerance(mut self, value: f64) -> TestResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(TestError::InvalidToleranceConfig(format!(
                "intensity tolerance must be a non-negative number, got {}",
                value
            )));
        }
        self.intensity_tolerance = value;
        Ok(self)
    }

    /// Replace the maximum number of differing pixels
    pub fn with_max_number_of_differences(mut self, value: i64) -> TestResult<Self> {
        self.max_number_of_differences = checked_count(value, "max number of differences")?;
        Ok(self)
    }

    /// Replace the tolerance radius
    pub fn with_tolerance_radius(mut self, value: i64) -> TestResult<Self> {
        self.tolerance_radius = checked_count(value, "tolerance radius")?;
        Ok(self)
    }

    /// Replace the neighborhood shape
    pub fn with_neighborhood(mut self, neighborhood: NeighborhoodShape) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    #[inline]
    pub fn intensity_tolerance(&self) -> f64 {
        self.intensity_tolerance
    }

    #[inline]
    pub fn max_number_of_differences(&self) -> u32 {
        self.max_number_of_differences
    }

    #[inline]
    pub fn tolerance_radius(&self) -> u32 {
        self.tolerance_radius
    }

    #[inline]
    pub fn neighborhood(&self) -> NeighborhoodShape {
        self.neighborhood
    }
}

fn checked_count(value: i64, what: &str) -> TestResult<u32> {
    u32::try_from(value).map_err(|_| {
        TestError::InvalidToleranceConfig(format!(
            "{} must be in 0..={}, got {}",
            what,
            u32::MAX,
            value
        ))
    })
}

/// One requested image comparison
///
/// Created once per `--compare` occurrence and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTest {
    test_image: PathBuf,
    baseline_template: PathBuf,
    settings: ToleranceSettings,
}

impl RegressionTest {
    /// Create a regression test from already validated settings
    pub fn new(
        test_image: impl Into<PathBuf>,
        baseline_template: impl Into<PathBuf>,
        settings: ToleranceSettings,
    ) -> Self {
        RegressionTest {
            test_image: test_image.into(),
            baseline_template: baseline_template.into(),
            settings,
        }
    }

    /// Validate raw values and create a regression test
    ///
    /// # Errors
    ///
    /// Returns `TestError::InvalidToleranceConfig` for out-of-range values,
    /// see [`ToleranceSettings::new`].
    pub fn from_raw(
        test_image: impl Into<PathBuf>,
        baseline_template: impl Into<PathBuf>,
        intensity_tolerance: f64,
        max_number_of_differences: i64,
        tolerance_radius: i64,
    ) -> TestResult<Self> {
        let settings =
            ToleranceSettings::new(intensity_tolerance, max_number_of_differences, tolerance_radius)?;
        Ok(Self::new(test_image, baseline_template, settings))
    }

    /// Path of the image produced by the test
    pub fn test_image(&self) -> &Path {
        &self.test_image
    }

    /// Path of the primary baseline, used as the naming template
    pub fn baseline_template(&self) -> &Path {
        &self.baseline_template
    }

    /// Tolerances for this comparison
    pub fn settings(&self) -> &ToleranceSettings {
        &self.settings
    }
}
