//! Sequential, zero-padded file stems
//!
//! Every stem has the same width, the number of decimal digits in the task
//! count, so lexicographic and numeric order of the output files both match
//! discovery order.

use crate::task::{ImageRef, Task};
use std::path::Path;

/// Number of decimal digits needed to print `count`
///
/// An empty run has no stems at all, so a count of zero yields zero.
pub fn stem_width(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    count.to_string().len()
}

/// 1-based `index` left-padded with zeros to `width`
pub fn stem(index: usize, width: usize) -> String {
    format!("{index:0width$}")
}

/// Turn discovered image references into tasks, numbered in discovery order
pub fn assign_stems(document: &Path, output_dir: &Path, images: &[ImageRef]) -> Vec<Task> {
    let width = stem_width(images.len());

    images
        .iter()
        .enumerate()
        .map(|(idx, image)| Task {
            document: document.to_path_buf(),
            image: *image,
            output_dir: output_dir.to_path_buf(),
            stem: stem(idx + 1, width),
        })
        .collect()
}
