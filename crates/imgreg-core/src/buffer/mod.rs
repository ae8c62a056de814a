//! PixelBuffer - N-dimensional sample buffer
//!
//! `PixelBuffer` stores one or more `f64` samples per coordinate of a
//! [`Shape`]. It is the common currency between the image loaders and the
//! regression comparator: every decoded format ends up here, regardless of
//! its on-disk bit depth.
//!
//! See [`serial`] for the native on-disk format.
//!
//! # Examples
//!
//! ```
//! use imgreg_core::{PixelBuffer, Shape};
//!
//! let shape = Shape::new_2d(3, 2).unwrap();
//! let mut buf = PixelBuffer::new(shape);
//!
//! buf.set(&[2, 1], 7.5).unwrap();
//! assert_eq!(buf.get(&[2, 1]).unwrap(), 7.5);
//! assert_eq!(buf.num_coordinates(), 6);
//! ```

pub mod serial;
mod shape;

pub use shape::{Coord, MAX_DIMENSION, Shape};

use crate::error::{Error, Result};

/// N-dimensional image of `f64` samples
///
/// # Memory Layout
///
/// Coordinates are stored with axis 0 varying fastest and no padding. The
/// `components` samples of one coordinate are interleaved, so the samples
/// of linear coordinate `i` occupy `data[i * components..(i + 1) * components]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    shape: Shape,
    /// Samples per coordinate (1 for scalar images, 3 for RGB, ...)
    components: usize,
    data: Vec<f64>,
}

impl PixelBuffer {
    /// Create a scalar buffer with all samples set to zero
    pub fn new(shape: Shape) -> Self {
        Self::new_with_value(shape, 0.0)
    }

    /// Create a scalar buffer with all samples set to `value`
    pub fn new_with_value(shape: Shape, value: f64) -> Self {
        PixelBuffer {
            shape,
            components: 1,
            data: vec![value; shape.num_coordinates()],
        }
    }

    /// Create a zeroed buffer with `components` samples per coordinate
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidComponents` if `components` is zero.
    pub fn with_components(shape: Shape, components: usize) -> Result<Self> {
        if components == 0 {
            return Err(Error::InvalidComponents(components));
        }
        let len = shape
            .num_coordinates()
            .checked_mul(components)
            .ok_or_else(|| Error::InvalidParameter("sample count overflows".to_string()))?;
        Ok(PixelBuffer {
            shape,
            components,
            data: vec![0.0; len],
        })
    }

    /// Create a buffer from raw samples
    ///
    /// # Errors
    ///
    /// Returns an error if `components` is zero or `data.len()` is not
    /// `shape.num_coordinates() * components`.
    pub fn from_data(shape: Shape, components: usize, data: Vec<f64>) -> Result<Self> {
        if components == 0 {
            return Err(Error::InvalidComponents(components));
        }
        let expected = shape.num_coordinates().saturating_mul(components);
        if data.len() != expected {
            return Err(Error::DataLength {
                shape: shape.to_string(),
                components,
                expected,
                actual: data.len(),
            });
        }
        Ok(PixelBuffer {
            shape,
            components,
            data,
        })
    }

    /// Create a scalar 2-D buffer from row-major samples
    ///
    /// ```
    /// use imgreg_core::PixelBuffer;
    ///
    /// let buf = PixelBuffer::from_2d(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(buf.get(&[1, 0]).unwrap(), 1.0);
    /// assert_eq!(buf.get(&[0, 1]).unwrap(), 2.0);
    /// ```
    pub fn from_2d(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        Self::from_data(Shape::new_2d(width, height)?, 1, data)
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Get the number of samples per coordinate
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Get the number of coordinates
    #[inline]
    pub fn num_coordinates(&self) -> usize {
        self.shape.num_coordinates()
    }

    /// Whether `other` can be compared sample by sample with `self`
    ///
    /// Two buffers are comparable only if shape and component count are
    /// identical.
    pub fn is_comparable(&self, other: &PixelBuffer) -> bool {
        self.shape == other.shape && self.components == other.components
    }

    /// Get raw access to the samples
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Get mutable access to the samples
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Samples of the coordinate with linear index `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_coordinates()`.
    #[inline]
    pub fn pixel(&self, index: usize) -> &[f64] {
        let start = index * self.components;
        &self.data[start..start + self.components]
    }

    /// Samples at `coord`
    ///
    /// # Errors
    ///
    /// Returns an error if `coord` is outside the shape.
    pub fn get_pixel(&self, coord: &[usize]) -> Result<&[f64]> {
        let index = self.shape.offset(coord)?;
        Ok(self.pixel(index))
    }

    /// First sample at `coord`
    ///
    /// # Errors
    ///
    /// Returns an error if `coord` is outside the shape.
    pub fn get(&self, coord: &[usize]) -> Result<f64> {
        Ok(self.get_pixel(coord)?[0])
    }

    /// Set every sample at `coord` to `value`
    ///
    /// # Errors
    ///
    /// Returns an error if `coord` is outside the shape.
    pub fn set(&mut self, coord: &[usize], value: f64) -> Result<()> {
        let index = self.shape.offset(coord)?;
        let start = index * self.components;
        self.data[start..start + self.components].fill(value);
        Ok(())
    }

    /// Set one sample at `coord`
    ///
    /// # Errors
    ///
    /// Returns an error if `coord` is outside the shape or `component` is
    /// not below [`PixelBuffer::components`].
    pub fn set_component(&mut self, coord: &[usize], component: usize, value: f64) -> Result<()> {
        if component >= self.components {
            return Err(Error::IndexOutOfBounds {
                index: component,
                len: self.components,
            });
        }
        let index = self.shape.offset(coord)?;
        self.data[index * self.components + component] = value;
        Ok(())
    }

    /// Set all samples to `value`
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Smallest and largest sample, ignoring NaN
    ///
    /// Returns `None` if every sample is NaN.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Consume the buffer and return its samples
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}
