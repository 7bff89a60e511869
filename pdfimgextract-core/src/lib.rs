//! # pdfimgextract
//!
//! Extracts the embedded raster images of a PDF document, one file per
//! image, using a fixed-size pool of worker processes.
//!
//! ## Pipeline
//!
//! 1. [`locate_images`] opens the document once and lists every image
//!    XObject reference, page by page.
//! 2. [`assign_stems`] numbers the images from 1 in discovery order, padded
//!    to the width of the total count (`01` .. `12`).
//! 3. [`WorkerPool`] hands each [`Task`] to a worker process, which reopens
//!    the document, decodes the image with [`decode_image`] and writes it
//!    with its native extension.
//!
//! JPEG streams are written unchanged as `.jpg`, JPEG 2000 as `.jpx`, and
//! everything else is decoded through its filters and re-encoded as `.png`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdfimgextract::{extract_images_parallel, WorkerCommand, WorkerOptions};
//! use std::path::Path;
//!
//! # fn main() -> pdfimgextract::Result<()> {
//! let options = WorkerOptions {
//!     num_workers: 4,
//!     command: WorkerCommand::new(std::env::current_exe()?).arg("--worker"),
//! };
//! let written = extract_images_parallel(Path::new("input.pdf"), Path::new("images"), options)?;
//! println!("{} images extracted", written.len());
//! # Ok(())
//! # }
//! ```
//!
//! The binary named by [`WorkerCommand`] must call [`worker::serve`] on its
//! standard streams when started that way.

pub mod decode;
pub mod error;
pub mod extract;
pub mod filters;
pub mod locator;
pub mod naming;
pub mod pipeline;
pub mod pool;
pub mod task;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use decode::{decode_image, DecodedImage, ImageFormat};
pub use error::{ExtractError, Result};
pub use extract::extract_task;
pub use locator::{locate_images, page_images};
pub use naming::{assign_stems, stem, stem_width};
pub use pipeline::extract_images_parallel;
pub use pool::{WorkerCommand, WorkerOptions, WorkerPool};
pub use task::{ImageRef, Task};
pub use worker::WorkerReply;

/// Current version of pdfimgextract
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
