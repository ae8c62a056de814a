//! Image shape and coordinate arithmetic
//!
//! A [`Shape`] holds the per-axis extents of an image. Axis 0 varies
//! fastest in memory, so for a 2-D image axis 0 is the column (x) and
//! axis 1 the row (y).

use crate::error::{Error, Result};
use std::fmt;

/// Maximum number of image axes
pub const MAX_DIMENSION: usize = 6;

/// A coordinate in the index space of a [`Shape`].
///
/// Only the first [`Shape::ndim`] entries are meaningful; the rest are zero.
pub type Coord = [usize; MAX_DIMENSION];

/// Per-axis extents of an image
///
/// Extents beyond `ndim` are stored as 1 so that two shapes with the same
/// visible extents always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    extents: [usize; MAX_DIMENSION],
    ndim: usize,
}

impl Shape {
    /// Create a shape from per-axis extents
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidShape` if there are no axes, more than
    /// [`MAX_DIMENSION`] axes, a zero extent, or if the number of
    /// coordinates overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use imgreg_core::Shape;
    ///
    /// let shape = Shape::new(&[4, 3, 2]).unwrap();
    /// assert_eq!(shape.ndim(), 3);
    /// assert_eq!(shape.num_coordinates(), 24);
    /// ```
    pub fn new(extents: &[usize]) -> Result<Self> {
        let invalid = |reason| Error::InvalidShape {
            extents: extents.to_vec(),
            reason,
        };

        if extents.is_empty() {
            return Err(invalid("no axes"));
        }
        if extents.len() > MAX_DIMENSION {
            return Err(invalid("too many axes"));
        }
        if extents.contains(&0) {
            return Err(invalid("zero extent"));
        }
        extents
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
            .ok_or_else(|| invalid("too many coordinates"))?;

        let mut buf = [1; MAX_DIMENSION];
        buf[..extents.len()].copy_from_slice(extents);
        Ok(Shape {
            extents: buf,
            ndim: extents.len(),
        })
    }

    /// Create a 2-D shape of `width` columns and `height` rows
    pub fn new_2d(width: usize, height: usize) -> Result<Self> {
        Self::new(&[width, height])
    }

    /// Number of axes
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Extents of the visible axes
    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents[..self.ndim]
    }

    /// Extent of one axis, `None` if the axis does not exist
    #[inline]
    pub fn extent(&self, axis: usize) -> Option<usize> {
        self.extents().get(axis).copied()
    }

    /// Total number of coordinates
    pub fn num_coordinates(&self) -> usize {
        self.extents.iter().product()
    }

    /// Linear stride of each axis, in coordinates
    pub fn strides(&self) -> Coord {
        let mut strides = [0; MAX_DIMENSION];
        let mut step = 1;
        for (axis, stride) in strides.iter_mut().enumerate().take(self.ndim) {
            *stride = step;
            step *= self.extents[axis];
        }
        strides
    }

    /// Whether `coord` lies inside the index space
    pub fn contains(&self, coord: &[usize]) -> bool {
        coord.len() == self.ndim && coord.iter().zip(self.extents()).all(|(&c, &e)| c < e)
    }

    /// Linear coordinate index of `coord`
    ///
    /// # Errors
    ///
    /// Returns `Error::AxisCountMismatch` if `coord` has the wrong number of
    /// axes and `Error::IndexOutOfBounds` if it lies outside the shape.
    pub fn offset(&self, coord: &[usize]) -> Result<usize> {
        if coord.len() != self.ndim {
            return Err(Error::AxisCountMismatch {
                expected: self.ndim,
                actual: coord.len(),
            });
        }
        let strides = self.strides();
        let mut index = 0;
        for (axis, (&c, &e)) in coord.iter().zip(self.extents()).enumerate() {
            if c >= e {
                return Err(Error::IndexOutOfBounds { index: c, len: e });
            }
            index += c * strides[axis];
        }
        Ok(index)
    }

    /// Coordinate of a linear index
    ///
    /// Inverse of [`Shape::offset`] for indices below
    /// [`Shape::num_coordinates`].
    pub fn coord_of(&self, index: usize) -> Coord {
        let mut coord = [0; MAX_DIMENSION];
        let mut rest = index;
        for (axis, c) in coord.iter_mut().enumerate().take(self.ndim) {
            *c = rest % self.extents[axis];
            rest /= self.extents[axis];
        }
        coord
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (axis, extent) in self.extents().iter().enumerate() {
            if axis > 0 {
                write!(f, "x")?;
            }
            write!(f, "{extent}")?;
        }
        Ok(())
    }
}
