//! Worker pool for parallel extraction
//!
//! Every worker is a separate OS process running [`crate::worker::serve`],
//! so no two extractions ever share a document handle. Each process is
//! driven by one dispatcher thread that pulls tasks from a shared queue.

use crate::error::{ExtractError, Result};
use crate::task::Task;
use crate::worker::WorkerReply;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

/// How to start a worker process
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn spawn(&self) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

/// Options for worker pool
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Number of worker processes
    pub num_workers: usize,
    /// Command line that starts one worker
    pub command: WorkerCommand,
}

type Outcome = (usize, Result<PathBuf>);

/// Fixed-size pool of worker processes
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: mpsc::Sender<(usize, Task)>,
    results: mpsc::Receiver<Outcome>,
    cancelled: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Start `options.num_workers` worker processes (at least one)
    pub fn new(options: WorkerOptions) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let (result_sender, results) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let num_workers = options.num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let process = WorkerProcess::start(&options.command)?;
            workers.push(Worker::new(
                id,
                process,
                Arc::clone(&receiver),
                result_sender.clone(),
                Arc::clone(&cancelled),
            ));
        }

        info!("started {} worker process(es)", num_workers);

        Ok(Self {
            workers,
            sender,
            results,
            cancelled,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Run every task and return the written paths in completion order.
    ///
    /// The first failure cancels tasks that have not started yet and is
    /// returned once the running ones have finished.
    pub fn run(self, tasks: Vec<Task>) -> Result<Vec<PathBuf>> {
        let WorkerPool {
            workers,
            sender,
            results,
            cancelled,
        } = self;

        let total = tasks.len();
        let mut stems = Vec::with_capacity(total);

        // Submit everything up front
        for (idx, task) in tasks.into_iter().enumerate() {
            stems.push(task.stem.clone());
            if sender.send((idx, task)).is_err() {
                break;
            }
        }
        drop(sender);

        let mut written = Vec::with_capacity(total);
        let mut failure = None;

        // Every dispatcher holds a result sender, so this ends once they have all exited
        for (idx, outcome) in results.iter().take(total) {
            match outcome {
                Ok(path) => {
                    debug!("image {} written to {}", stems[idx], path.display());
                    written.push(path);
                }
                Err(e) => {
                    warn!("image {} failed, cancelling remaining tasks", stems[idx]);
                    cancelled.store(true, Ordering::SeqCst);
                    failure = Some(e);
                    break;
                }
            }
        }

        for worker in workers {
            worker.join();
        }

        if let Some(e) = failure {
            return Err(e);
        }

        if written.len() != total {
            return Err(ExtractError::Incomplete {
                completed: written.len(),
                total,
            });
        }

        info!("all {} image(s) extracted", total);
        Ok(written)
    }
}

/// Dispatcher thread bound to one worker process
struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(
        id: usize,
        mut process: WorkerProcess,
        receiver: Arc<Mutex<mpsc::Receiver<(usize, Task)>>>,
        results: mpsc::Sender<Outcome>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        let thread = thread::spawn(move || {
            loop {
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }

                let message = match receiver.lock() {
                    Ok(receiver) => receiver.recv(),
                    Err(_) => break,
                };

                let (idx, task) = match message {
                    Ok(message) => message,
                    Err(_) => break,
                };

                if cancelled.load(Ordering::SeqCst) {
                    break;
                }

                let outcome = process.extract(&task);
                let failed = outcome.is_err();
                if results.send((idx, outcome)).is_err() || failed {
                    break;
                }
            }

            debug!("worker {} shutting down", id);
            process.shutdown();
        });

        Self {
            thread: Some(thread),
        }
    }

    /// Wait for the worker to finish
    fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Pipes to one running worker process
struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn start(command: &WorkerCommand) -> Result<Self> {
        let mut child = command.spawn()?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExtractError::Spawn {
                    program: command.program.clone(),
                    source: std::io::Error::other("worker pipes unavailable"),
                });
            }
        };

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    /// Send one task and wait for its reply
    fn extract(&mut self, task: &Task) -> Result<PathBuf> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ExtractError::WorkerExited(task.stem.clone()))?;

        let mut line = serde_json::to_vec(task)?;
        line.push(b'\n');
        if stdin.write_all(&line).and_then(|_| stdin.flush()).is_err() {
            return Err(ExtractError::WorkerExited(task.stem.clone()));
        }

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            return Err(ExtractError::WorkerExited(task.stem.clone()));
        }

        let reply: WorkerReply = serde_json::from_str(&reply)?;
        reply.into_result(task)
    }

    /// Close the task stream and reap the process
    fn shutdown(&mut self) {
        drop(self.stdin.take());
        match self.child.wait() {
            Ok(status) if !status.success() => warn!("worker process exited with {}", status),
            Ok(_) => {}
            Err(e) => warn!("failed to wait for worker process: {}", e),
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
