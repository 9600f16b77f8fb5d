use std::future::Future;

use futures::{FutureExt, pin_mut, select};
use tracing::{error, info, warn};

use crate::application::RuntimeConfig;
use crate::journal::Journal;
use crate::reconciler::{ReconcileError, Reconciler};

/// Runs passes back to back, `interval` apart, until told to stop.
///
/// Passes never overlap and are never interrupted: the stop signal is only
/// looked at while waiting between passes.
pub struct Scheduler {
    config: RuntimeConfig,
}

impl Scheduler {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Loops until `stop` resolves or a pass fails fatally.
    ///
    /// `stop` is polled once before the first pass so that signal listeners
    /// are registered before any mutation happens.
    pub async fn run_until<J: Journal>(
        &self,
        journal: &mut J,
        stop: impl Future<Output = ()>,
    ) -> Result<(), ReconcileError> {
        let stop = stop.fuse();
        pin_mut!(stop);

        if futures::poll!(stop.as_mut()).is_ready() {
            journal.record("Synchronization stopped by user.");
            return Ok(());
        }

        loop {
            self.run_pass(journal)?;
            if self.config.once {
                return Ok(());
            }

            journal.record(&format!(
                "Synchronization complete. Waiting {} seconds for next sync.",
                self.config.interval.as_secs()
            ));

            let sleep = compio::time::sleep(self.config.interval).fuse();
            pin_mut!(sleep);
            select! {
                () = sleep => {}
                () = stop => {
                    info!("Stop requested, leaving the sync loop");
                    journal.record("Synchronization stopped by user.");
                    return Ok(());
                }
            }
        }
    }

    fn run_pass<J: Journal>(&self, journal: &mut J) -> Result<(), ReconcileError> {
        match Reconciler::reconcile(&self.config.source, &self.config.replica, journal) {
            Ok(outcome) => {
                for line in outcome.summary_lines(&self.config.replica) {
                    journal.record(&line);
                }
                Ok(())
            }
            Err(err) if err.is_fatal() => {
                error!("Fatal synchronization error: {}", err);
                let message = match &err {
                    ReconcileError::SourceMissing { .. } => format!(
                        "Source path '{}' does not exist. Exiting.",
                        self.config.source.display()
                    ),
                    other => format!("{other}. Exiting."),
                };
                journal.record(&message);
                Err(err)
            }
            Err(err) => {
                warn!("Synchronization pass failed: {}", err);
                journal.record(&format!("{err}. Retrying next pass."));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(root: &Path, interval: Duration, once: bool) -> RuntimeConfig {
        RuntimeConfig {
            source: root.join("source"),
            replica: root.join("replica"),
            interval,
            log_file: root.join("sync.log"),
            quiet: true,
            once,
        }
    }

    #[compio::test]
    async fn single_pass_mirrors_and_summarizes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("source")).unwrap();
        fs::write(temp_dir.path().join("source/a.txt"), "a").unwrap();
        let scheduler = Scheduler::new(config(temp_dir.path(), Duration::from_secs(30), true));
        let mut journal = MemoryJournal::default();

        let result = scheduler
            .run_until(&mut journal, futures::future::pending())
            .await;

        assert!(result.is_ok());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("replica/a.txt")).unwrap(),
            "a"
        );
        assert!(journal.contains("Copying file 'a.txt'."));
        assert!(journal.contains("Sync complete. 1 files copied/updated"));
        assert!(!journal.contains("Waiting"));
    }

    #[compio::test]
    async fn stop_between_passes_is_logged() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("source")).unwrap();
        let scheduler = Scheduler::new(config(temp_dir.path(), Duration::from_secs(3600), false));
        let mut journal = MemoryJournal::default();

        let result = scheduler
            .run_until(
                &mut journal,
                compio::time::sleep(Duration::from_millis(20)),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(
            journal.messages,
            vec![
                format!(
                    "Replica path '{}' does not exist. Creating.",
                    temp_dir.path().join("replica").display()
                ),
                "No changes were made during synchronization.".to_string(),
                "Synchronization complete. Waiting 3600 seconds for next sync.".to_string(),
                "Synchronization stopped by user.".to_string(),
            ]
        );
    }

    #[compio::test]
    async fn stop_before_first_pass_skips_it() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scheduler = Scheduler::new(config(temp_dir.path(), Duration::from_secs(1), false));
        let mut journal = MemoryJournal::default();

        let result = scheduler
            .run_until(&mut journal, futures::future::ready(()))
            .await;

        assert!(result.is_ok());
        assert_eq!(journal.messages, vec!["Synchronization stopped by user."]);
        assert!(!temp_dir.path().join("replica").exists());
    }

    #[compio::test]
    async fn missing_source_ends_the_loop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scheduler = Scheduler::new(config(temp_dir.path(), Duration::from_secs(1), false));
        let mut journal = MemoryJournal::default();

        let result = scheduler
            .run_until(&mut journal, futures::future::pending())
            .await;

        assert!(matches!(result, Err(ReconcileError::SourceMissing { .. })));
        assert_eq!(
            journal.messages,
            vec![format!(
                "Source path '{}' does not exist. Exiting.",
                temp_dir.path().join("source").display()
            )]
        );
    }

    #[compio::test]
    async fn replica_failures_are_retried_not_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("source")).unwrap();
        fs::write(temp_dir.path().join("replica"), "in the way").unwrap();
        let scheduler = Scheduler::new(config(temp_dir.path(), Duration::from_secs(1), true));
        let mut journal = MemoryJournal::default();

        let result = scheduler
            .run_until(&mut journal, futures::future::pending())
            .await;

        assert!(result.is_ok());
        assert!(journal.contains("is not a directory. Retrying next pass."));
    }
}
