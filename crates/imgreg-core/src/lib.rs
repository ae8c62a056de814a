//! imgreg core - Sample buffers for image regression testing
//!
//! This crate provides the data structures shared by the image loaders and
//! the regression verdict engine:
//!
//! - [`Shape`] - Per-axis extents of an image, 1 to [`MAX_DIMENSION`] axes
//! - [`PixelBuffer`] - `f64` samples addressed by coordinate, with an
//!   optional number of interleaved components per coordinate
//!
//! Buffers can be serialized to a small native format (see
//! [`buffer::serial`]), the only on-disk format that carries more than
//! three axes.

pub mod buffer;
pub mod error;

pub use buffer::{Coord, MAX_DIMENSION, PixelBuffer, Shape};
pub use error::{Error, Result};
