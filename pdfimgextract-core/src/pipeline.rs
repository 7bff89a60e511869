//! Locate, name and extract every image of a document

use crate::error::Result;
use crate::locator::locate_images;
use crate::naming::assign_stems;
use crate::pool::{WorkerOptions, WorkerPool};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extract every embedded image of `input` into `output_dir` using a pool of
/// worker processes, returning the written paths in completion order.
///
/// `output_dir` is created once the document has been read, so a document
/// without images leaves an empty folder and starts no worker.
pub fn extract_images_parallel(
    input: &Path,
    output_dir: &Path,
    options: WorkerOptions,
) -> Result<Vec<PathBuf>> {
    let images = locate_images(input)?;
    info!("{} image(s) found in {}", images.len(), input.display());

    fs::create_dir_all(output_dir)?;

    let tasks = assign_stems(input, output_dir, &images);
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let options = WorkerOptions {
        num_workers: options.num_workers.clamp(1, tasks.len()),
        ..options
    };

    WorkerPool::new(options)?.run(tasks)
}
