//! Worker process endpoint
//!
//! A worker reads one JSON encoded [`Task`] per line on its input and answers
//! each with one JSON encoded [`WorkerReply`] line on its output. It exits
//! when its input is closed.

use crate::error::{ExtractError, Result};
use crate::extract::extract_task;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Answer to a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerReply {
    Written { path: PathBuf },
    Failed { message: String },
}

impl WorkerReply {
    pub fn from_result(result: Result<PathBuf>) -> Self {
        match result {
            Ok(path) => WorkerReply::Written { path },
            Err(e) => WorkerReply::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Convert back into the driver's view of the task outcome
    pub fn into_result(self, task: &Task) -> Result<PathBuf> {
        match self {
            WorkerReply::Written { path } => Ok(path),
            WorkerReply::Failed { message } => Err(ExtractError::Worker {
                stem: task.stem.clone(),
                message,
            }),
        }
    }
}

/// Serve tasks until `input` reaches end of file
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(&line)?;
        debug!("worker {} picked up image {}", std::process::id(), task.stem);

        let result = extract_task(&task);
        if let Err(e) = &result {
            warn!("image {} ({}) failed: {}", task.stem, task.image, e);
        }

        serde_json::to_writer(&mut output, &WorkerReply::from_result(result))?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(())
}
