mod args;
mod style;

use anyhow::{Context, Result};
use args::{Cli, WORKER_FLAG};
use pdfimgextract::{extract_images_parallel, worker, WorkerCommand, WorkerOptions};
use style::{completion_line, Palette};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // stdout carries the completion line, or the reply stream in worker mode
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let palette = Palette::from_env();
    let cli = args::parse_or_exit(std::env::args_os(), &palette);

    let result = if cli.worker {
        run_worker()
    } else {
        run(cli, &palette)
    };

    if let Err(e) = result {
        palette.fail(format!("{e:#}"));
    }
}

fn run(cli: Cli, palette: &Palette) -> Result<()> {
    let settings = cli.resolve()?;
    tracing::debug!("{:?}", settings);

    let program = std::env::current_exe().context("Cannot locate the pdfimgextract executable")?;
    let options = WorkerOptions {
        num_workers: settings.workers,
        command: WorkerCommand::new(program).arg(WORKER_FLAG),
    };

    let written = extract_images_parallel(&settings.input, &settings.output, options)
        .with_context(|| {
            format!(
                "Failed to extract images from '{}'",
                settings.input.display()
            )
        })?;

    println!(
        "{}",
        palette.success(completion_line(written.len(), &settings.output))
    );
    Ok(())
}

fn run_worker() -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    worker::serve(stdin.lock(), stdout.lock()).context("Worker stopped")
}
