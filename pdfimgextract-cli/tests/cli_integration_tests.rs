//! Integration tests for the pdfimgextract CLI
//!
//! Runs the built binary against generated documents and checks:
//! - file naming and native extensions
//! - argument validation and exit codes
//! - worker-count independence and reruns

use anyhow::Result;
use pdfimgextract::testing::{FixtureImage, PdfFixture};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

/// Test helper to get the CLI binary path
fn get_cli_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdfimgextract"))
}

/// Test helper to create a temporary directory
fn setup_temp_dir() -> TempDir {
    tempdir().expect("Failed to create temp directory")
}

/// Test helper to run the CLI with colors off and return its output
fn run_cli_command<S: AsRef<std::ffi::OsStr>>(args: &[S]) -> Result<Output> {
    let output = Command::new(get_cli_path())
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

/// Sorted file names in `dir`, empty if it does not exist
fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn three_page_fixture(temp_dir: &TempDir) -> PathBuf {
    let input = temp_dir.path().join("three_pages.pdf");
    PdfFixture::new()
        .page(vec![FixtureImage::gray(4, 4), FixtureImage::jpeg(8, 8)])
        .page(vec![])
        .page(vec![FixtureImage::rgb(3, 2)])
        .save(&input)
        .unwrap();
    input
}

#[test]
fn test_cli_extracts_in_discovery_order() {
    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);
    let output_dir = temp_dir.path().join("images");

    let output = run_cli_command(&[
        "-i".as_ref(),
        input.as_os_str(),
        "-o".as_ref(),
        output_dir.as_os_str(),
    ])
    .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(file_names(&output_dir), vec!["1.png", "2.jpg", "3.png"]);
    assert_eq!(
        stdout_of(&output).trim_end(),
        format!("3 images extracted to {}", output_dir.display())
    );

    let first = image::open(output_dir.join("1.png")).unwrap();
    assert_eq!((first.width(), first.height()), (4, 4));
    let jpeg = fs::read(output_dir.join("2.jpg")).unwrap();
    assert!(jpeg.starts_with(&[0xFF, 0xD8]));
}

#[test]
fn test_cli_zero_padded_names() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("twelve.pdf");
    let fixture = (0..4).fold(PdfFixture::new(), |fixture, _| {
        fixture.page(vec![
            FixtureImage::gray(2, 2),
            FixtureImage::flate_rgb(2, 2),
            FixtureImage::jpeg(4, 4),
        ])
    });
    fixture.save(&input).unwrap();
    let output_dir = temp_dir.path().join("out");

    let output = run_cli_command(&[
        input.as_os_str(),
        output_dir.as_os_str(),
        "3".as_ref(),
    ])
    .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let expected: Vec<String> = fixture
        .extensions()
        .iter()
        .enumerate()
        .map(|(idx, ext)| format!("{:02}.{}", idx + 1, ext))
        .collect();
    let mut expected_sorted = expected.clone();
    expected_sorted.sort();

    assert_eq!(expected.len(), 12);
    assert_eq!(expected[0], "01.png");
    assert_eq!(expected[11], "12.jpg");
    assert_eq!(file_names(&output_dir), expected_sorted);
}

#[test]
fn test_cli_document_without_images() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("blank.pdf");
    PdfFixture::new().page(vec![]).page(vec![]).save(&input).unwrap();
    let output_dir = temp_dir.path().join("out");

    let output = run_cli_command(&[input.as_os_str(), output_dir.as_os_str()]).unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).starts_with("0 images extracted to "));
    assert!(output_dir.is_dir());
    assert!(file_names(&output_dir).is_empty());
}

#[test]
fn test_cli_text_only_and_inherited_pages() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("irregular.pdf");
    PdfFixture::new()
        .page(vec![FixtureImage::gray(4, 4), FixtureImage::jpeg(8, 8)])
        .text_page()
        .page(vec![FixtureImage::rgb(3, 2)])
        .inherit_resources()
        .save(&input)
        .unwrap();
    let output_dir = temp_dir.path().join("images");

    let output = run_cli_command(&[input.as_os_str(), output_dir.as_os_str()]).unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(file_names(&output_dir), vec!["1.png", "2.jpg", "3.png"]);
    assert!(stdout_of(&output).starts_with("3 images extracted to "));
}

#[test]
fn test_cli_form_wrapped_and_indirect_images() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("forms.pdf");
    PdfFixture::new()
        .page(vec![
            FixtureImage::in_form(FixtureImage::jpeg(6, 6)),
            FixtureImage::gray_indirect_size(5, 3),
        ])
        .save(&input)
        .unwrap();
    let output_dir = temp_dir.path().join("images");

    let output = run_cli_command(&["-i".as_ref(), input.as_os_str(), "-o".as_ref(), output_dir.as_os_str()])
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(file_names(&output_dir), vec!["1.jpg", "2.png"]);
    let gray = image::open(output_dir.join("2.png")).unwrap();
    assert_eq!((gray.width(), gray.height()), (5, 3));
}

#[test]
fn test_cli_parallelism_does_not_change_result() {
    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);

    let mut listings = Vec::new();
    for workers in ["1", "2", "8"] {
        let output_dir = temp_dir.path().join(format!("out_{workers}"));
        let output = run_cli_command(&[
            "-i".as_ref(),
            input.as_os_str(),
            "-o".as_ref(),
            output_dir.as_os_str(),
            "-p".as_ref(),
            workers.as_ref(),
        ])
        .unwrap();
        assert!(output.status.success(), "stderr: {}", stderr_of(&output));
        listings.push(file_names(&output_dir));
    }

    assert_eq!(listings[0], listings[1]);
    assert_eq!(listings[1], listings[2]);
}

#[test]
fn test_cli_rerun_overwrites() {
    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);
    let output_dir = temp_dir.path().join("out");
    let args = [input.as_os_str(), output_dir.as_os_str()];

    assert!(run_cli_command(&args).unwrap().status.success());
    let first = fs::read(output_dir.join("3.png")).unwrap();

    assert!(run_cli_command(&args).unwrap().status.success());
    assert_eq!(file_names(&output_dir), vec!["1.png", "2.jpg", "3.png"]);
    assert_eq!(fs::read(output_dir.join("3.png")).unwrap(), first);
}

#[test]
fn test_cli_flag_wins_over_positional() {
    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);
    let flagged = temp_dir.path().join("flagged");
    let positional = temp_dir.path().join("positional");

    let output = run_cli_command(&[
        "-o".as_ref(),
        flagged.as_os_str(),
        input.as_os_str(),
        positional.as_os_str(),
    ])
    .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(file_names(&flagged).len(), 3);
    assert!(!positional.exists());
}

#[test]
fn test_cli_nonexistent_input() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("missing.pdf");
    let output_dir = temp_dir.path().join("out");

    let output = run_cli_command(&[
        "-i".as_ref(),
        input.as_os_str(),
        "-o".as_ref(),
        output_dir.as_os_str(),
    ])
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).is_empty());
    assert!(stderr_of(&output).contains(&format!(
        "Error: Input file '{}' does not exist or is not a file.",
        input.display()
    )));
    assert!(!output_dir.exists());
}

#[test]
fn test_cli_missing_arguments() {
    let output = run_cli_command::<&str>(&[]).unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Error: Input PDF not specified."));

    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);
    let output = run_cli_command(&["-i".as_ref(), input.as_os_str()]).unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Error: Output folder not specified."));
}

#[test]
fn test_cli_rejects_bad_parallelism() {
    let temp_dir = setup_temp_dir();
    let input = three_page_fixture(&temp_dir);
    let output_dir = temp_dir.path().join("out");

    for value in ["0", "abc", "-3"] {
        let output = run_cli_command(&[
            "-i".as_ref(),
            input.as_os_str(),
            "-o".as_ref(),
            output_dir.as_os_str(),
            "-p".as_ref(),
            value.as_ref(),
        ])
        .unwrap();

        assert_eq!(output.status.code(), Some(1), "value {value}");
        assert!(stderr_of(&output).starts_with("Error: "));
    }
    assert!(!output_dir.exists());
}

#[test]
fn test_cli_unsupported_image_fails() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("jbig2.pdf");
    PdfFixture::new()
        .page(vec![FixtureImage::jbig2()])
        .save(&input)
        .unwrap();
    let output_dir = temp_dir.path().join("out");

    let output = run_cli_command(&[input.as_os_str(), output_dir.as_os_str()]).unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).is_empty());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("Error: Failed to extract images from"));
    assert!(stderr.contains("JBIG2"));
}

#[test]
fn test_cli_not_a_pdf_fails() {
    let temp_dir = setup_temp_dir();
    let input = temp_dir.path().join("notes.txt");
    fs::write(&input, "plain text").unwrap();

    let output = run_cli_command(&[input.as_os_str(), temp_dir.path().join("out").as_os_str()])
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Error: Failed to extract images from"));
}

#[test]
fn test_cli_help_and_version() {
    let output = run_cli_command(&["--help"]).unwrap();
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Extract embedded images from PDF files"));
    assert!(stdout.contains("pdfimgextract input.pdf output_folder 4"));
    assert!(!stdout.contains("--worker"));

    let output = run_cli_command(&["--version"]).unwrap();
    assert!(output.status.success());
    assert!(stdout_of(&output).contains(env!("CARGO_PKG_VERSION")));
}
