use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::config::MirrorConfig;

const DEFAULT_SOURCE: &str = "./source";
const DEFAULT_REPLICA: &str = "./replica";
const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOG_FILE: &str = "./folder_sync.log";

/// Fully resolved settings: command line first, then the config file, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
    pub quiet: bool,
    pub once: bool,
}

impl RuntimeConfig {
    pub fn resolve(cli: Cli, file: MirrorConfig) -> Self {
        Self {
            source: cli
                .source
                .or(file.source)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE)),
            replica: cli
                .replica
                .or(file.replica)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPLICA)),
            interval: Duration::from_secs(
                cli.interval
                    .or(file.interval)
                    .unwrap_or(DEFAULT_INTERVAL_SECS),
            ),
            log_file: cli
                .log_file
                .or(file.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            quiet: cli.quiet,
            once: cli.once,
        }
    }
}
