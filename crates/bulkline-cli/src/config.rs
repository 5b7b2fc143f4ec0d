use anyhow::bail;
use bulkline::{Overflow, QueuePolicy};
use clap::{Parser, ValueEnum};
use core::fmt;
use std::path::PathBuf;

/// Runtime configuration for the `bulkline` binary.
///
/// Every option can also be set through the environment (or a `.env` file),
/// which is convenient when the binary runs as a pipeline stage.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bulkline",
    version,
    about = "Groups commands into bulks and logs them to the console and to files"
)]
pub struct CliArgs {
    /// Number of commands per bulk outside of `{` ... `}` blocks.
    ///
    /// Environment variable: `BULK_SIZE`
    #[arg(short = 'n', long, env = "BULK_SIZE")]
    pub bulk_size: usize,

    /// Directory receiving one `bulk<time>_<seq>.log` file per bulk.
    ///
    /// Environment variable: `BULK_LOG_DIR`
    #[arg(long, env = "BULK_LOG_DIR", default_value = ".")]
    pub log_dir: PathBuf,

    /// Do not print bulks to standard output.
    #[arg(long, default_value_t = false)]
    pub no_console: bool,

    /// Do not write bulks to files.
    #[arg(long, default_value_t = false)]
    pub no_file: bool,

    /// Maximum number of bulks waiting in each sink queue (0 = unbounded).
    ///
    /// Environment variable: `BULK_QUEUE_CAPACITY`
    #[arg(long, env = "BULK_QUEUE_CAPACITY", default_value_t = 0)]
    pub queue_capacity: usize,

    /// What a full bounded queue does with a new bulk.
    ///
    /// Ignored unless `--queue-capacity` is set.
    ///
    /// Environment variable: `BULK_OVERFLOW`
    #[arg(long, env = "BULK_OVERFLOW", value_enum, default_value_t = OverflowArg::Block)]
    pub overflow: OverflowArg,

    /// Input files, one handle each, fed concurrently. `-` or no input reads
    /// standard input.
    pub inputs: Vec<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowArg {
    /// Wait for the sink to catch up.
    Block,
    /// Discard the bulk and count it.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bulk_size: usize,
    pub console: bool,
    pub log_dir: Option<PathBuf>,
    pub queue: QueuePolicy,
    pub inputs: Vec<Input>,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.bulk_size == 0 {
            bail!("BULK_SIZE must be greater than 0");
        }

        if args.no_console && args.no_file {
            bail!("At least one of the console or file sinks must be enabled");
        }

        let queue = match args.queue_capacity {
            0 => QueuePolicy::Unbounded,
            capacity => QueuePolicy::Bounded {
                capacity,
                overflow: match args.overflow {
                    OverflowArg::Block => Overflow::Block,
                    OverflowArg::Drop => Overflow::Drop,
                },
            },
        };

        let mut inputs: Vec<Input> = args
            .inputs
            .into_iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    Input::Stdin
                } else {
                    Input::File(path)
                }
            })
            .collect();
        if inputs.is_empty() {
            inputs.push(Input::Stdin);
        }
        if inputs.iter().filter(|input| **input == Input::Stdin).count() > 1 {
            bail!("Standard input can only be read once");
        }

        Ok(Self {
            bulk_size: args.bulk_size,
            console: !args.no_console,
            log_dir: (!args.no_file).then_some(args.log_dir),
            queue,
            inputs,
        })
    }
}
