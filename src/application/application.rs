use std::path::Path;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, error};

use crate::application::RuntimeConfig;
use crate::application::scheduler::Scheduler;
use crate::cli::Cli;
use crate::config::{ConfigError, MirrorConfig};
use crate::journal::{JournalError, LogFile};
use crate::reconciler::ReconcileError;

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let file_config = MirrorConfig::read(cli.config.as_deref(), Path::new("."))
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config file settings: {:?}", file_config);

        let config = RuntimeConfig::resolve(cli, file_config);
        debug!("Resolved runtime config: {:?}", config);

        let mut journal = LogFile::open(&config.log_file, !config.quiet).context(JournalSnafu)?;

        Scheduler::new(config)
            .run_until(&mut journal, interrupted())
            .await
            .context(SynchronizationSnafu)?;

        Ok(())
    }
}

/// Resolves on Ctrl-C. If the listener can't be installed, never resolves.
async fn interrupted() {
    if let Err(err) = compio::signal::ctrl_c().await {
        error!("Failed to listen for the interrupt signal: {}", err);
        futures::future::pending::<()>().await;
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Critical failure encountered while opening the sync journal"))]
    JournalError { source: JournalError },
    #[snafu(display("Critical failure encountered during synchronization"))]
    SynchronizationError { source: ReconcileError },
}
