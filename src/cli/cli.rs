use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Keeps a replica directory an exact mirror of a source directory.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from [default: ./source]
    #[clap(long, short)]
    pub source: Option<PathBuf>,

    /// Directory kept identical to the source [default: ./replica]
    #[clap(long, short)]
    pub replica: Option<PathBuf>,

    /// Seconds to wait between passes [default: 30]
    #[clap(long, short, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// File the sync journal is appended to [default: ./folder_sync.log]
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// YAML file with `source`, `replica`, `interval` and `log_file` keys [default: ./mirror.yaml]
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Don't echo journal lines to stdout
    #[clap(long, short)]
    pub quiet: bool,

    /// Run a single pass and exit
    #[clap(long)]
    pub once: bool,
}
