use crate::style::Palette;
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

/// Worker processes used when no parallelism is given
pub const DEFAULT_PARALLELISM: usize = 4;

/// Hidden flag that starts the binary as a worker process
pub const WORKER_FLAG: &str = "--worker";

const EXAMPLES: &str = "\
Examples:
  pdfimgextract input.pdf output_folder 4
  pdfimgextract -i file.pdf -o output_folder -p 4";

#[derive(Parser, Debug)]
#[command(
    name = "pdfimgextract",
    about = "Extract embedded images from PDF files",
    version,
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Input PDF file
    #[arg(short, long, value_name = "PDF")]
    pub input: Option<PathBuf>,

    /// Output folder, created if missing
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of worker processes [default: 4]
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub parallelism: Option<u16>,

    /// Input PDF file, when -i is not given
    #[arg(value_name = "INPUT")]
    pub input_pos: Option<PathBuf>,

    /// Output folder, when -o is not given
    #[arg(value_name = "OUTPUT")]
    pub output_pos: Option<PathBuf>,

    /// Number of worker processes, when -p is not given
    #[arg(value_name = "PARALLELISM", value_parser = clap::value_parser!(u16).range(1..))]
    pub parallelism_pos: Option<u16>,

    /// Serve extraction tasks on stdin/stdout
    #[arg(long, hide = true)]
    pub worker: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("Input PDF not specified.")]
    MissingInput,

    #[error("Input file '{}' does not exist or is not a file.", .0.display())]
    InputNotAFile(PathBuf),

    #[error("Output folder not specified.")]
    MissingOutput,
}

/// Validated run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
}

impl Cli {
    /// Merge flags with positionals (flags win) and validate
    pub fn resolve(self) -> Result<Settings, ArgsError> {
        let input = self
            .input
            .or(self.input_pos)
            .ok_or(ArgsError::MissingInput)?;
        if !input.is_file() {
            return Err(ArgsError::InputNotAFile(input));
        }

        let output = self
            .output
            .or(self.output_pos)
            .ok_or(ArgsError::MissingOutput)?;

        let workers = self
            .parallelism
            .or(self.parallelism_pos)
            .map(usize::from)
            .unwrap_or(DEFAULT_PARALLELISM);

        Ok(Settings {
            input,
            output,
            workers,
        })
    }
}

/// Parse the command line, exiting on help, version or a malformed argument
pub fn parse_or_exit<I, T>(args: I, palette: &Palette) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => palette.fail(clap_message(&e)),
        },
    }
}

/// First line of a clap error without its own `error: ` prefix
fn clap_message(e: &clap::Error) -> String {
    let rendered = e.render().to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
