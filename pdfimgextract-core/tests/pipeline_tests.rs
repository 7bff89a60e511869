//! Library-level pipeline tests
//!
//! Drives locate -> name -> extract in-process, one task at a time, so the
//! results can be checked without a worker binary.

use pdfimgextract::testing::{FixtureImage, PdfFixture};
use pdfimgextract::{
    assign_stems, extract_images_parallel, extract_task, locate_images, ExtractError,
    WorkerCommand, WorkerOptions,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_sequential_pipeline_matches_discovery_order() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("doc.pdf");
    let output_dir = temp_dir.path().join("out");

    PdfFixture::new()
        .page(vec![FixtureImage::gray(3, 3), FixtureImage::jpeg(6, 4)])
        .page(vec![])
        .page(vec![FixtureImage::flate_rgb(2, 5)])
        .save(&input)
        .unwrap();

    let images = locate_images(&input).unwrap();
    let tasks = assign_stems(&input, &output_dir, &images);
    let stems: Vec<&str> = tasks.iter().map(|task| task.stem.as_str()).collect();
    assert_eq!(stems, vec!["1", "2", "3"]);

    let written: Vec<_> = tasks.iter().map(|task| extract_task(task).unwrap()).collect();

    assert_eq!(
        written,
        vec![
            output_dir.join("1.png"),
            output_dir.join("2.jpg"),
            output_dir.join("3.png"),
        ]
    );
    assert_eq!(listing(&output_dir), vec!["1.png", "2.jpg", "3.png"]);
}

#[test]
fn test_ten_images_get_two_digit_stems() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("ten.pdf");
    let output_dir = temp_dir.path().join("out");

    PdfFixture::new()
        .page((0..6).map(|_| FixtureImage::gray(1, 1)).collect())
        .page((0..4).map(|_| FixtureImage::rgb(1, 1)).collect())
        .save(&input)
        .unwrap();

    let tasks = assign_stems(&input, &output_dir, &locate_images(&input).unwrap());
    for task in &tasks {
        extract_task(task).unwrap();
    }

    let expected: Vec<String> = (1..=10).map(|i| format!("{i:02}.png")).collect();
    assert_eq!(listing(&output_dir), expected);
}

#[test]
fn test_sequential_pipeline_over_irregular_pages() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("irregular.pdf");
    let output_dir = temp_dir.path().join("out");

    PdfFixture::new()
        .page(vec![
            FixtureImage::in_form(FixtureImage::jpeg(4, 4)),
            FixtureImage::gray(2, 2),
        ])
        .text_page()
        .page(vec![FixtureImage::gray_indirect_size(3, 2)])
        .inherit_resources()
        .save(&input)
        .unwrap();

    let tasks = assign_stems(&input, &output_dir, &locate_images(&input).unwrap());
    for task in &tasks {
        extract_task(task).unwrap();
    }

    assert_eq!(listing(&output_dir), vec!["1.jpg", "2.png", "3.png"]);
    let third = image::open(output_dir.join("3.png")).unwrap();
    assert_eq!((third.width(), third.height()), (3, 2));
}

#[test]
fn test_parallel_pipeline_without_images() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("blank.pdf");
    let output_dir = temp_dir.path().join("out");
    PdfFixture::new().page(vec![]).save(&input).unwrap();

    let options = WorkerOptions {
        num_workers: 4,
        command: WorkerCommand::new("/definitely/not/a/worker/binary"),
    };
    let written = extract_images_parallel(&input, &output_dir, options).unwrap();

    assert!(written.is_empty());
    assert!(output_dir.is_dir());
    assert!(listing(&output_dir).is_empty());
}

#[test]
fn test_parallel_pipeline_reports_spawn_failure() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("one.pdf");
    PdfFixture::new()
        .page(vec![FixtureImage::gray(2, 2)])
        .save(&input)
        .unwrap();

    let options = WorkerOptions {
        num_workers: 2,
        command: WorkerCommand::new("/definitely/not/a/worker/binary"),
    };
    let result = extract_images_parallel(&input, &temp_dir.path().join("out"), options);

    assert!(matches!(result, Err(ExtractError::Spawn { .. })));
}
