//! Decode-and-write for a single task

use crate::decode::decode_image;
use crate::error::Result;
use crate::task::Task;
use lopdf::Document;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Reopen the task's document, decode its image and write it under the
/// task's stem with the image's native extension.
///
/// Each call holds its own document handle; nothing is shared between tasks.
pub fn extract_task(task: &Task) -> Result<PathBuf> {
    let image = {
        let doc = Document::load(&task.document)?;
        decode_image(&doc, task.image)?
    };

    // concurrent workers may race to create it, create_dir_all tolerates that
    fs::create_dir_all(&task.output_dir)?;

    let path = task.output_path(image.format.extension());
    fs::write(&path, &image.data)?;

    debug!(
        "{} -> {} ({}x{}, {} bytes)",
        task.image,
        path.display(),
        image.width,
        image.height,
        image.data.len()
    );

    Ok(path)
}
