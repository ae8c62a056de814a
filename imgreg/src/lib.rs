//! imgreg - Image regression testing
//!
//! Runs a test program, then checks that the images it produced match
//! stored baselines within numeric and spatial tolerances.
//!
//! # Overview
//!
//! - [`PixelBuffer`] and [`Shape`] - N-dimensional sample buffers
//! - [`io`] - Image decoding (PNG, TIFF stacks, PNM, JPEG, native buffers)
//! - [`test`] - Baseline discovery, tolerant comparison, verdicts, reports
//! - [`cli`] and [`driver`] - The `imgreg-testdriver` command
//!
//! # Example
//!
//! ```
//! use imgreg::{PixelBuffer, ToleranceSettings, compare_buffers};
//!
//! let test = PixelBuffer::from_2d(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
//! let baseline = PixelBuffer::from_2d(2, 2, vec![0.0, 1.0, 2.0, 9.0]).unwrap();
//! let settings = ToleranceSettings::default();
//! assert_eq!(compare_buffers(&test, &baseline, &settings).unwrap(), 1);
//! ```

pub mod cli;
pub mod driver;

// Re-export core types (primary data structures used everywhere)
pub use imgreg_core::*;

// Re-export the verdict engine at the top level, sub-crates as modules
pub use imgreg_io as io;
pub use imgreg_test as test;
pub use imgreg_test::{
    FileImageAccess, ImageAccess, NeighborhoodShape, RegressionTest, ToleranceSettings, Verdict,
    baseline_filenames, compare_buffers, evaluate, run_suite,
};
