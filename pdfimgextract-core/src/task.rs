//! Units of work handed to extraction workers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Indirect object id of an image XObject, meaningful only within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub number: u32,
    pub generation: u16,
}

impl ImageRef {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    /// The id in the form `lopdf` addresses objects with
    pub fn object_id(&self) -> lopdf::ObjectId {
        (self.number, self.generation)
    }
}

impl From<lopdf::ObjectId> for ImageRef {
    fn from((number, generation): lopdf::ObjectId) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// One image to extract: which image, from which document, written where.
///
/// Tasks are built by [`crate::naming::assign_stems`] and are not modified
/// afterwards. They cross the process boundary as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub document: PathBuf,
    pub image: ImageRef,
    pub output_dir: PathBuf,
    pub stem: String,
}

impl Task {
    /// Destination path for this task once the image extension is known
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.stem, extension))
    }
}
