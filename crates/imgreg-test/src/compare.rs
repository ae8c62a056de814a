//! Tolerant pixel comparison
//!
//! A coordinate of the test image matches if its samples lie within the
//! intensity tolerance of the baseline samples at the same coordinate, or,
//! failing that, of any baseline coordinate inside the tolerance
//! neighborhood around it. The comparison reports how many coordinates
//! did not match.
//!
//! # See also
//!
//! [`crate::verdict`] turns counts into pass/fail results.

use crate::error::{TestError, TestResult};
use crate::params::ToleranceSettings;
use imgreg_core::{Coord, MAX_DIMENSION, PixelBuffer, Shape};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Shape of the tolerance neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NeighborhoodShape {
    /// Axis-aligned hyper-cube of side `2r + 1` (Chebyshev distance)
    #[default]
    Cube,
    /// Coordinates within Euclidean distance `r`
    Ball,
}

impl NeighborhoodShape {
    pub fn as_str(self) -> &'static str {
        match self {
            NeighborhoodShape::Cube => "cube",
            NeighborhoodShape::Ball => "ball",
        }
    }
}

impl fmt::Display for NeighborhoodShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeighborhoodShape {
    type Err = TestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cube" => Ok(NeighborhoodShape::Cube),
            "ball" => Ok(NeighborhoodShape::Ball),
            _ => Err(TestError::InvalidToleranceConfig(format!(
                "unknown neighborhood shape '{}', expected 'cube' or 'ball'",
                s
            ))),
        }
    }
}

/// Count test coordinates that match no baseline coordinate
///
/// Rows along axis 0 are compared in parallel, each with its own count.
/// The sum does not depend on scheduling.
///
/// # Errors
///
/// Returns `TestError::DimensionMismatch` if the buffers differ in shape or
/// component count.
///
/// # Examples
///
/// ```
/// use imgreg_core::PixelBuffer;
/// use imgreg_test::{ToleranceSettings, compare_buffers};
///
/// let test = PixelBuffer::from_2d(2, 1, vec![0.0, 10.0]).unwrap();
/// let baseline = PixelBuffer::from_2d(2, 1, vec![0.0, 0.0]).unwrap();
/// let settings = ToleranceSettings::new(2.0, 0, 0).unwrap();
/// assert_eq!(compare_buffers(&test, &baseline, &settings).unwrap(), 1);
/// ```
pub fn compare_buffers(
    test: &PixelBuffer,
    baseline: &PixelBuffer,
    settings: &ToleranceSettings,
) -> TestResult<u64> {
    if !test.is_comparable(baseline) {
        return Err(TestError::DimensionMismatch {
            test: describe(test),
            baseline: describe(baseline),
        });
    }

    let shape = test.shape();
    let row_len = shape.extents()[0];
    let rows = shape.num_coordinates() / row_len;
    let search = Search::new(shape, settings);

    let count = (0..rows)
        .into_par_iter()
        .map(|row| {
            let start = row * row_len;
            (start..start + row_len)
                .filter(|&index| !search.matches(test, baseline, index))
                .count() as u64
        })
        .sum();
    Ok(count)
}

/// Shape and component count, as shown in mismatch messages
fn describe(buffer: &PixelBuffer) -> String {
    if buffer.components() == 1 {
        buffer.shape().to_string()
    } else {
        format!("{} ({} components)", buffer.shape(), buffer.components())
    }
}

/// Whether two samples lie within `tolerance` of each other
///
/// Equal values always match, so equal infinities do too. NaN matches
/// nothing, except another NaN when `same_coord` is set.
#[inline]
fn within(a: f64, b: f64, tolerance: f64, same_coord: bool) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return same_coord && a.is_nan() && b.is_nan();
    }
    (a - b).abs() <= tolerance
}

/// Per-comparison lookup state
struct Search<'a> {
    shape: &'a Shape,
    strides: Coord,
    tolerance: f64,
    radius: usize,
    neighborhood: NeighborhoodShape,
}

impl<'a> Search<'a> {
    fn new(shape: &'a Shape, settings: &ToleranceSettings) -> Self {
        Search {
            shape,
            strides: shape.strides(),
            tolerance: settings.intensity_tolerance(),
            radius: settings.tolerance_radius() as usize,
            neighborhood: settings.neighborhood(),
        }
    }

    fn pixels_match(&self, t: &[f64], b: &[f64], same_coord: bool) -> bool {
        t.iter()
            .zip(b)
            .all(|(&x, &y)| within(x, y, self.tolerance, same_coord))
    }

    fn matches(&self, test: &PixelBuffer, baseline: &PixelBuffer, index: usize) -> bool {
        let t = test.pixel(index);
        if self.pixels_match(t, baseline.pixel(index), true) {
            return true;
        }
        if self.radius == 0 {
            return false;
        }

        let ndim = self.shape.ndim();
        let extents = self.shape.extents();
        let center = self.shape.coord_of(index);
        let mut lo = [0usize; MAX_DIMENSION];
        let mut hi = [0usize; MAX_DIMENSION];
        for axis in 0..ndim {
            lo[axis] = center[axis].saturating_sub(self.radius);
            hi[axis] = (center[axis] + self.radius).min(extents[axis] - 1);
        }

        // Odometer walk over the clipped box, axis 0 fastest
        let mut q = lo;
        loop {
            if q != center && self.in_neighborhood(&q, &center) {
                let offset: usize = (0..ndim).map(|a| q[a] * self.strides[a]).sum();
                if self.pixels_match(t, baseline.pixel(offset), false) {
                    return true;
                }
            }

            let mut axis = 0;
            loop {
                if axis == ndim {
                    return false;
                }
                if q[axis] < hi[axis] {
                    q[axis] += 1;
                    break;
                }
                q[axis] = lo[axis];
                axis += 1;
            }
        }
    }

    fn in_neighborhood(&self, q: &Coord, center: &Coord) -> bool {
        match self.neighborhood {
            NeighborhoodShape::Cube => true,
            NeighborhoodShape::Ball => {
                let r = self.radius as u64;
                let dist2: u64 = q
                    .iter()
                    .zip(center)
                    .map(|(&a, &b)| {
                        let d = a.abs_diff(b) as u64;
                        d * d
                    })
                    .sum();
                dist2 <= r * r
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tol: f64, radius: i64) -> ToleranceSettings {
        ToleranceSettings::new(tol, 0, radius).unwrap()
    }

    fn image(w: usize, h: usize, data: &[f64]) -> PixelBuffer {
        PixelBuffer::from_2d(w, h, data.to_vec()).unwrap()
    }

    #[test]
    fn test_within() {
        assert!(within(1.0, 3.0, 2.0, false));
        assert!(!within(1.0, 3.5, 2.0, false));
        assert!(within(f64::INFINITY, f64::INFINITY, 0.0, false));
        assert!(!within(f64::INFINITY, f64::NEG_INFINITY, 1e300, false));
        assert!(within(f64::NAN, f64::NAN, 0.0, true));
        assert!(!within(f64::NAN, f64::NAN, 0.0, false));
        assert!(!within(f64::NAN, 0.0, f64::MAX, true));
    }

    #[test]
    fn test_exact_and_tolerance() {
        let a = image(3, 1, &[0.0, 5.0, 10.0]);
        let b = image(3, 1, &[0.0, 6.0, 13.0]);
        assert_eq!(compare_buffers(&a, &b, &settings(0.0, 0)).unwrap(), 2);
        assert_eq!(compare_buffers(&a, &b, &settings(1.0, 0)).unwrap(), 1);
        assert_eq!(compare_buffers(&a, &b, &settings(3.0, 0)).unwrap(), 0);
    }

    #[test]
    fn test_shift_absorbed_by_radius() {
        // A bright pixel moved by one column
        let a = image(4, 1, &[0.0, 100.0, 0.0, 0.0]);
        let b = image(4, 1, &[0.0, 0.0, 100.0, 0.0]);
        assert_eq!(compare_buffers(&a, &b, &settings(0.0, 0)).unwrap(), 2);
        assert_eq!(compare_buffers(&a, &b, &settings(0.0, 1)).unwrap(), 0);
    }

    #[test]
    fn test_neighborhood_clipped_at_border() {
        let a = image(2, 2, &[9.0, 0.0, 0.0, 0.0]);
        let b = image(2, 2, &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(compare_buffers(&a, &b, &settings(0.0, 5)).unwrap(), 1);
    }

    #[test]
    fn test_ball_excludes_corners() {
        // Only the diagonal neighbor of the center holds the matching value
        let mut data = vec![0.0; 9];
        data[0] = 7.0;
        let b = image(3, 3, &data);
        let mut t = vec![0.0; 9];
        t[4] = 7.0;
        let a = image(3, 3, &t);

        let cube = settings(0.0, 1);
        let ball = cube.with_neighborhood(NeighborhoodShape::Ball);
        assert_eq!(compare_buffers(&a, &b, &cube).unwrap(), 0);
        assert_eq!(compare_buffers(&a, &b, &ball).unwrap(), 1);
    }

    #[test]
    fn test_multi_component_distance_is_max() {
        let shape = Shape::new(&[1, 1]).unwrap();
        let a = PixelBuffer::from_data(shape, 3, vec![10.0, 10.0, 10.0]).unwrap();
        let b = PixelBuffer::from_data(shape, 3, vec![10.0, 12.0, 13.0]).unwrap();
        assert_eq!(compare_buffers(&a, &b, &settings(2.0, 0)).unwrap(), 1);
        assert_eq!(compare_buffers(&a, &b, &settings(3.0, 0)).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = PixelBuffer::new(Shape::new_2d(3, 3).unwrap());
        let b = PixelBuffer::new(Shape::new_2d(4, 4).unwrap());
        let err = compare_buffers(&a, &b, &settings(0.0, 0)).unwrap_err();
        assert!(matches!(err, TestError::DimensionMismatch { .. }));

        let rgb = PixelBuffer::with_components(Shape::new_2d(3, 3).unwrap(), 3).unwrap();
        assert!(compare_buffers(&a, &rgb, &settings(0.0, 0)).is_err());
    }

    #[test]
    fn test_three_dimensional_search() {
        let shape = Shape::new(&[2, 2, 3]).unwrap();
        let mut a = PixelBuffer::new(shape);
        let mut b = PixelBuffer::new(shape);
        a.set(&[0, 0, 1], 4.0).unwrap();
        b.set(&[0, 0, 2], 4.0).unwrap();
        let strict = settings(0.0, 0);
        assert_eq!(compare_buffers(&a, &b, &strict).unwrap(), 2);
        assert_eq!(compare_buffers(&a, &b, &settings(0.0, 1)).unwrap(), 0);
    }

    #[test]
    fn test_neighborhood_from_str() {
        assert_eq!("cube".parse::<NeighborhoodShape>().unwrap(), NeighborhoodShape::Cube);
        assert_eq!("Ball".parse::<NeighborhoodShape>().unwrap(), NeighborhoodShape::Ball);
        assert!("sphere".parse::<NeighborhoodShape>().is_err());
        assert_eq!(NeighborhoodShape::Ball.to_string(), "ball");
    }
}
