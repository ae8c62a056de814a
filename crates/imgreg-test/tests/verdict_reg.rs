//! Verdict regression test
//!
//! Tests best-match selection across several baselines, the handling of
//! unloadable and mismatched images, and end-to-end evaluation of files
//! written to a temporary directory.

use imgreg_core::{PixelBuffer, Shape};
use imgreg_io::ImageFormat;
use imgreg_test::{
    ErrorKind, FileImageAccess, MemoryImageAccess, RegParams, RegressionTest, evaluate,
    evaluate_with_baselines,
};
use std::path::{Path, PathBuf};

fn zeros(w: usize, h: usize) -> PixelBuffer {
    PixelBuffer::new(Shape::new_2d(w, h).unwrap())
}

fn with_corner(value: f64) -> PixelBuffer {
    let mut buffer = zeros(3, 3);
    buffer.set(&[2, 2], value).unwrap();
    buffer
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

// ==========================================================================
// Test 1: End-to-end on files
// ==========================================================================

#[test]
fn verdict_reg_corner_pixel_files() {
    let mut rp = RegParams::new("verdict_corner");
    let dir = tempfile::tempdir().unwrap();
    let test_path = dir.path().join("out.png");
    let baseline_path = dir.path().join("base.png");
    imgreg_io::write_image(&zeros(3, 3), &test_path, ImageFormat::Png).unwrap();
    imgreg_io::write_image(&with_corner(100.0), &baseline_path, ImageFormat::Png).unwrap();

    let strict = RegressionTest::from_raw(&test_path, &baseline_path, 0.0, 0, 0).unwrap();
    let verdict = evaluate(&strict, &FileImageAccess);
    rp.compare_verdict(false, &verdict);
    rp.compare_values(1.0, verdict.best_count().unwrap_or(u64::MAX) as f64, 0.0);
    rp.compare_values(1.0, verdict.per_baseline_results.len() as f64, 0.0);

    let lenient = RegressionTest::from_raw(&test_path, &baseline_path, 0.0, 1, 0).unwrap();
    let verdict = evaluate(&lenient, &FileImageAccess);
    rp.compare_verdict(true, &verdict);
    rp.compare_values(
        1.0,
        flag(verdict.chosen_baseline.as_deref() == Some(baseline_path.as_path())),
        0.0,
    );

    assert!(rp.cleanup(), "verdict_reg corner pixel tests failed");
}

#[test]
fn verdict_reg_numbered_baselines_on_disk() {
    let mut rp = RegParams::new("verdict_numbered");
    let dir = tempfile::tempdir().unwrap();
    let test_path = dir.path().join("out.imgbuf");
    imgreg_io::write_image(&with_corner(50.0), &test_path, ImageFormat::Native).unwrap();

    // Primary is far off, .1 is close, .2 is exact
    let fmt = ImageFormat::Native;
    imgreg_io::write_image(&zeros(3, 3), dir.path().join("base.imgbuf"), fmt).unwrap();
    imgreg_io::write_image(&with_corner(45.0), dir.path().join("base.1.imgbuf"), fmt).unwrap();
    imgreg_io::write_image(&with_corner(50.0), dir.path().join("base.2.imgbuf"), fmt).unwrap();

    let test = RegressionTest::from_raw(&test_path, dir.path().join("base.imgbuf"), 2.0, 0, 0)
        .unwrap();
    let verdict = evaluate(&test, &FileImageAccess);
    rp.compare_verdict(true, &verdict);
    rp.compare_values(3.0, verdict.per_baseline_results.len() as f64, 0.0);
    rp.compare_values(
        1.0,
        flag(verdict.chosen_baseline == Some(dir.path().join("base.2.imgbuf"))),
        0.0,
    );
    let counts: Vec<_> = verdict
        .per_baseline_results
        .iter()
        .map(|r| r.differing_pixel_count)
        .collect();
    rp.compare_values(1.0, flag(counts == [Some(1), Some(1), Some(0)]), 0.0);

    assert!(rp.cleanup(), "verdict_reg numbered baseline tests failed");
}

// ==========================================================================
// Test 2: Selection and failures with in-memory images
// ==========================================================================

#[test]
fn verdict_reg_tie_breaks_by_discovery_order() {
    let mut rp = RegParams::new("verdict_ties");

    let access = MemoryImageAccess::new()
        .with("t", with_corner(9.0))
        .with("b0", zeros(3, 3))
        .with("b1", with_corner(1.0))
        .with("b2", with_corner(2.0));
    let baselines: Vec<PathBuf> = ["b0", "b1", "b2"].iter().map(PathBuf::from).collect();

    let test = RegressionTest::from_raw("t", "b0", 0.0, 0, 0).unwrap();
    let verdict = evaluate_with_baselines(&test, &baselines, &access);
    rp.compare_verdict(false, &verdict);
    // All three differ in exactly one coordinate
    rp.compare_values(
        1.0,
        flag(verdict.chosen_baseline.as_deref() == Some(Path::new("b0"))),
        0.0,
    );

    assert!(rp.cleanup(), "verdict_reg tie tests failed");
}

#[test]
fn verdict_reg_mismatch_does_not_block_other_baselines() {
    let mut rp = RegParams::new("verdict_mismatch");

    let access = MemoryImageAccess::new()
        .with("t", zeros(3, 3))
        .with("big", zeros(4, 4))
        .with("good", zeros(3, 3));
    let baselines = vec![PathBuf::from("big"), PathBuf::from("missing"), PathBuf::from("good")];

    let test = RegressionTest::from_raw("t", "big", 0.0, 0, 0).unwrap();
    let verdict = evaluate_with_baselines(&test, &baselines, &access);
    rp.compare_verdict(true, &verdict);

    let results = &verdict.per_baseline_results;
    let kind = |i: usize| results[i].error.as_ref().map(|d| d.kind);
    rp.compare_values(1.0, flag(kind(0) == Some(ErrorKind::DimensionMismatch)), 0.0);
    rp.compare_values(1.0, flag(kind(1) == Some(ErrorKind::ImageLoad)), 0.0);
    rp.compare_values(1.0, flag(kind(2).is_none()), 0.0);
    rp.compare_values(
        1.0,
        flag(verdict.chosen_baseline.as_deref() == Some(Path::new("good"))),
        0.0,
    );

    // Only the mismatched baseline: fails with its classification
    let verdict = evaluate_with_baselines(&test, &baselines[..1], &access);
    rp.compare_verdict(false, &verdict);
    rp.compare_values(
        1.0,
        flag(verdict.failure_kind() == Some(ErrorKind::DimensionMismatch)),
        0.0,
    );

    assert!(rp.cleanup(), "verdict_reg mismatch tests failed");
}

#[test]
fn verdict_reg_unloadable_test_image() {
    let mut rp = RegParams::new("verdict_unloadable");

    let access = MemoryImageAccess::new().with("b", zeros(2, 2)).with("b.1", zeros(2, 2));
    let baselines = vec![PathBuf::from("b"), PathBuf::from("b.1")];
    let test = RegressionTest::from_raw("absent", "b", 2.0, 0, 0).unwrap();
    let verdict = evaluate_with_baselines(&test, &baselines, &access);

    rp.compare_verdict(false, &verdict);
    rp.compare_values(2.0, verdict.per_baseline_results.len() as f64, 0.0);
    let all_load_errors = verdict
        .per_baseline_results
        .iter()
        .all(|r| !r.passed && r.error.as_ref().map(|d| d.kind) == Some(ErrorKind::ImageLoad));
    rp.compare_values(1.0, flag(all_load_errors), 0.0);
    rp.compare_values(
        1.0,
        flag(verdict.failure.as_ref().map(|d| d.kind) == Some(ErrorKind::ImageLoad)),
        0.0,
    );

    assert!(rp.cleanup(), "verdict_reg unloadable test image tests failed");
}

#[test]
fn verdict_reg_no_baseline() {
    let mut rp = RegParams::new("verdict_no_baseline");
    let dir = tempfile::tempdir().unwrap();

    let test = RegressionTest::from_raw(
        dir.path().join("out.png"),
        dir.path().join("absent.png"),
        2.0,
        0,
        0,
    )
    .unwrap();
    let verdict = evaluate(&test, &FileImageAccess);
    rp.compare_verdict(false, &verdict);
    rp.compare_values(0.0, verdict.per_baseline_results.len() as f64, 0.0);
    rp.compare_values(
        1.0,
        flag(verdict.failure_kind() == Some(ErrorKind::BaselineNotFound)),
        0.0,
    );

    assert!(rp.cleanup(), "verdict_reg no baseline tests failed");
}

#[test]
fn verdict_reg_corrupt_header_is_load_error() {
    let mut rp = RegParams::new("verdict_corrupt_header");
    let dir = tempfile::tempdir().unwrap();
    let test_path = dir.path().join("out.pgm");
    std::fs::write(&test_path, b"P5\n1 1\n255\n\x07").unwrap();
    // Width times height overflows on 64-bit targets
    std::fs::write(
        dir.path().join("base.pnm"),
        b"P6\n4294967295 4294967295\n255\n\0\0\0",
    )
    .unwrap();

    let test = RegressionTest::from_raw(&test_path, dir.path().join("base.pnm"), 0.0, 0, 0)
        .unwrap();
    let verdict = evaluate(&test, &FileImageAccess);
    rp.compare_verdict(false, &verdict);
    rp.compare_values(1.0, verdict.per_baseline_results.len() as f64, 0.0);
    let kind = verdict.per_baseline_results[0].error.as_ref().map(|d| d.kind);
    rp.compare_values(1.0, flag(kind == Some(ErrorKind::ImageLoad)), 0.0);

    // A readable numbered baseline still decides the verdict
    std::fs::write(dir.path().join("base.1.pnm"), b"P5\n1 1\n255\n\x07").unwrap();
    let verdict = evaluate(&test, &FileImageAccess);
    rp.compare_verdict(true, &verdict);
    rp.compare_values(2.0, verdict.per_baseline_results.len() as f64, 0.0);

    assert!(rp.cleanup(), "verdict_reg corrupt header tests failed");
}

// ==========================================================================
// Test 3: Determinism
// ==========================================================================

#[test]
fn verdict_reg_deterministic() {
    let mut rp = RegParams::new("verdict_deterministic");

    let mut access = MemoryImageAccess::new().with("t", with_corner(7.0));
    let mut baselines = Vec::new();
    for i in 0..16 {
        let name = PathBuf::from(format!("b{i}"));
        access.insert(name.clone(), with_corner(f64::from(i % 4)));
        baselines.push(name);
    }
    let test = RegressionTest::from_raw("t", "b0", 0.5, 0, 1).unwrap();

    let first = evaluate_with_baselines(&test, &baselines, &access);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let serial = pool.install(|| evaluate_with_baselines(&test, &baselines, &access));
    let again = evaluate_with_baselines(&test, &baselines, &access);

    rp.compare_values(1.0, flag(first == serial), 0.0);
    rp.compare_values(1.0, flag(first == again), 0.0);
    rp.compare_values(16.0, first.per_baseline_results.len() as f64, 0.0);

    assert!(rp.cleanup(), "verdict_reg determinism tests failed");
}
