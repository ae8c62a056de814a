//! Baseline discovery
//!
//! A test may be compared against several acceptable baselines. They are
//! named after the primary baseline with a numeric suffix inserted before
//! the file extension:
//!
//! ```text
//! baseline.nii      (the template itself)
//! baseline.1.nii
//! baseline.2.nii
//! ...
//! ```
//!
//! Numbered candidates are tried from 1 upwards and the scan stops at the
//! first missing index.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered list of existing baseline files for a template
///
/// The template comes first if it exists, followed by `stem.1.ext`,
/// `stem.2.ext`, ... up to the first gap. Only the last dot-separated
/// segment of the file name counts as extension; a name without one
/// yields `stem.1`, `stem.2`, ... The function only checks for existence
/// and never opens a file.
///
/// # Examples
///
/// ```no_run
/// use imgreg_test::baseline_filenames;
///
/// for path in baseline_filenames("baseline/brain.nii") {
///     println!("{}", path.display());
/// }
/// ```
pub fn baseline_filenames(template: impl AsRef<Path>) -> Vec<PathBuf> {
    let template = template.as_ref();
    let mut baselines = Vec::new();

    if template.is_file() {
        baselines.push(template.to_path_buf());
    }

    for index in 1u64.. {
        let candidate = numbered_baseline(template, index);
        if !candidate.is_file() {
            break;
        }
        baselines.push(candidate);
    }

    debug!(
        template = %template.display(),
        found = baselines.len(),
        "discovered baselines"
    );
    baselines
}

/// Path of the `index`-th numbered sibling of `template`
///
/// ```
/// use imgreg_test::baseline::numbered_baseline;
/// use std::path::Path;
///
/// assert_eq!(
///     numbered_baseline(Path::new("dir/img.nii.gz"), 2),
///     Path::new("dir/img.nii.2.gz")
/// );
/// ```
pub fn numbered_baseline(template: &Path, index: u64) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = template.file_stem() {
        name.push(stem);
    }
    name.push(format!(".{index}"));
    if let Some(ext) = template.extension() {
        name.push(".");
        name.push(ext);
    }
    template.with_file_name(name)
}
