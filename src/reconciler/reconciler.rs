use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use super::{ActionKind, SkippedEntry, SyncAction, SyncOutcome};
use crate::ext::BestEffortPathExt;
use crate::filesystem::{
    EntryKind, PathEntry, TreeReadError, read_children, read_children_in_place,
};
use crate::journal::Journal;

/// Name prefix of in-flight copies inside the replica.
const STAGING_PREFIX: &str = ".treemirror-";

/// Converges a replica tree onto a source tree, one pass at a time.
///
/// A pass walks the source top-down creating and refreshing replica entries,
/// then walks the replica bottom-up removing whatever the source lacks. Files
/// are compared by modification time only.
pub struct Reconciler<'a, J: Journal> {
    source_root: &'a Path,
    replica_root: &'a Path,
    journal: &'a mut J,
    outcome: SyncOutcome,
}

impl<'a, J: Journal> Reconciler<'a, J> {
    /// Runs one full pass and returns what it did.
    ///
    /// Only a missing or unreadable source root, or a replica root that can't be
    /// made into a directory, fails the pass. Per-entry failures are recorded in
    /// the journal and in [`SyncOutcome::skipped`].
    pub fn reconcile(
        source_root: &'a Path,
        replica_root: &'a Path,
        journal: &'a mut J,
    ) -> Result<SyncOutcome, ReconcileError> {
        Self::check_source(source_root)?;
        let source_children =
            read_children(source_root, Path::new("")).context(SourceListingSnafu)?;
        Self::prepare_replica(replica_root, journal)?;

        let mut reconciler = Self {
            source_root,
            replica_root,
            journal,
            outcome: SyncOutcome::default(),
        };

        info!(
            "Mirroring {} onto {}",
            source_root.best_effort_path_display(),
            replica_root.best_effort_path_display()
        );
        reconciler.mirror_directory(source_children);
        reconciler.prune_directory(Path::new(""));

        debug!(
            "Pass finished with {} actions and {} skipped entries",
            reconciler.outcome.actions().len(),
            reconciler.outcome.skipped().len()
        );
        Ok(reconciler.outcome)
    }

    fn check_source(source_root: &Path) -> Result<(), ReconcileError> {
        match fs::metadata(source_root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => SourceNotDirectorySnafu {
                path: source_root.to_path_buf(),
            }
            .fail(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => SourceMissingSnafu {
                path: source_root.to_path_buf(),
            }
            .fail(),
            Err(err) => Err(err).context(SourceUnreadableSnafu {
                path: source_root.to_path_buf(),
            }),
        }
    }

    fn prepare_replica(replica_root: &Path, journal: &mut J) -> Result<(), ReconcileError> {
        match fs::metadata(replica_root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => ReplicaNotDirectorySnafu {
                path: replica_root.to_path_buf(),
            }
            .fail(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                journal.record(&format!(
                    "Replica path '{}' does not exist. Creating.",
                    replica_root.display()
                ));
                fs::create_dir_all(replica_root).context(ReplicaCreationSnafu {
                    path: replica_root.to_path_buf(),
                })
            }
            Err(err) => Err(err).context(ReplicaCreationSnafu {
                path: replica_root.to_path_buf(),
            }),
        }
    }

    /// Forward pass over one source directory whose children are already listed.
    ///
    /// Missing subdirectories are created first, then files are copied or
    /// refreshed, then each subdirectory is walked in turn.
    fn mirror_directory(&mut self, children: Vec<PathEntry>) {
        let (directories, files): (Vec<_>, Vec<_>) = children
            .into_iter()
            .partition(|entry| entry.kind == EntryKind::Directory);

        let ready = directories
            .into_iter()
            .filter(|directory| self.ensure_directory(directory))
            .collect::<Vec<_>>();

        for file in &files {
            self.mirror_file(file);
        }

        for directory in ready {
            if directory.is_link {
                debug!(
                    "Not descending into linked directory {}",
                    directory.relative_path.display()
                );
                continue;
            }
            match read_children(self.source_root, &directory.relative_path) {
                Ok(children) => self.mirror_directory(children),
                Err(err) => self.skip(&directory.relative_path, "read directory", &err),
            }
        }
    }

    /// Makes sure a directory exists in the replica. Returns false if it could not.
    fn ensure_directory(&mut self, directory: &PathEntry) -> bool {
        let relative = &directory.relative_path;
        match PathEntry::lookup(self.replica_root, relative) {
            Ok(Some(existing)) if existing.kind == EntryKind::Directory => return true,
            Ok(Some(existing)) => {
                if !self.remove_entry(&existing) {
                    return false;
                }
            }
            Ok(None) => {}
            Err(err) => {
                self.skip(relative, "inspect directory", &err);
                return false;
            }
        }

        match fs::create_dir(self.replica_root.join(relative)) {
            Ok(()) => {
                self.perform(ActionKind::CreateDirectory, relative);
                true
            }
            Err(err) => {
                self.skip(relative, "create directory", &err);
                false
            }
        }
    }

    fn mirror_file(&mut self, file: &PathEntry) {
        let relative = &file.relative_path;
        let action = match PathEntry::lookup(self.replica_root, relative) {
            Ok(None) => ActionKind::Copy,
            Ok(Some(existing)) if existing.kind == EntryKind::File => {
                if !is_newer(file.modified_time, existing.modified_time) {
                    return;
                }
                ActionKind::Update
            }
            Ok(Some(existing)) => {
                if !self.remove_entry(&existing) {
                    return;
                }
                ActionKind::Copy
            }
            Err(err) => {
                self.skip(relative, "inspect file", &err);
                return;
            }
        };

        let verb = match action {
            ActionKind::Update => "update file",
            _ => "copy file",
        };
        match self.copy_file(file) {
            Ok(()) => self.perform(action, relative),
            Err(err) => self.skip(relative, verb, &err),
        }
    }

    /// Copies content into a staging file next to the target, stamps it with
    /// the source's times and renames it over the target.
    ///
    /// The target is either fully replaced or left as it was, so a failed copy
    /// never leaves a partial file whose fresh mtime would hide it from later passes.
    fn copy_file(&self, file: &PathEntry) -> io::Result<()> {
        let source = self.source_root.join(&file.relative_path);
        let target = self.replica_root.join(&file.relative_path);
        let parent = target.parent().unwrap_or(self.replica_root);

        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(parent)?;
        fs::copy(&source, staged.path())?;

        let metadata = fs::metadata(&source)?;
        let modified = file
            .modified_time
            .map(FileTime::from_system_time)
            .unwrap_or_else(|| FileTime::from_last_modification_time(&metadata));
        let accessed = FileTime::from_last_access_time(&metadata);
        filetime::set_file_times(staged.path(), accessed, modified)?;

        staged.persist(&target).map_err(|err| err.error)?;
        Ok(())
    }

    /// Reverse pass: children first, then anything at this level the source lacks.
    fn prune_directory(&mut self, relative: &Path) {
        let children = match read_children_in_place(self.replica_root, relative) {
            Ok(children) => children,
            Err(err) => {
                self.skip(relative, "read directory", &err);
                return;
            }
        };

        let (directories, files): (Vec<_>, Vec<_>) = children
            .into_iter()
            .partition(|entry| entry.kind == EntryKind::Directory);

        for directory in &directories {
            self.prune_directory(&directory.relative_path);
        }

        for entry in files.iter().chain(directories.iter()) {
            if !PathEntry::exists(self.source_root, &entry.relative_path) {
                self.remove_entry(entry);
            }
        }
    }

    /// Removes a replica entry, with whatever is left beneath it. Returns false on failure.
    fn remove_entry(&mut self, entry: &PathEntry) -> bool {
        let target = self.replica_root.join(&entry.relative_path);
        let (kind, verb, result) = if entry.kind == EntryKind::Directory {
            (
                ActionKind::RemoveDirectory,
                "remove directory",
                fs::remove_dir_all(&target),
            )
        } else {
            (ActionKind::RemoveFile, "remove file", fs::remove_file(&target))
        };

        match result {
            Ok(()) => {
                self.perform(kind, &entry.relative_path);
                true
            }
            Err(err) => {
                self.skip(&entry.relative_path, verb, &err);
                false
            }
        }
    }

    fn perform(&mut self, kind: ActionKind, relative: &Path) {
        let action = SyncAction::new(kind, relative);
        debug!("Applied {} to {}", kind, relative.display());
        self.journal.record(&action.to_string());
        self.outcome.push_action(action);
    }

    fn skip(&mut self, relative: &Path, operation: &'static str, err: &dyn std::error::Error) {
        let skipped = SkippedEntry {
            relative_path: relative.to_path_buf(),
            operation,
            reason: error_chain(err),
        };
        self.journal.record(&skipped.to_string());
        self.outcome.push_skipped(skipped);
    }
}

/// Source wins only when strictly newer; ties and unknown source times leave the replica alone.
fn is_newer(source: Option<SystemTime>, replica: Option<SystemTime>) -> bool {
    match (source, replica) {
        (Some(source), Some(replica)) => source > replica,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Snafu)]
pub enum ReconcileError {
    #[snafu(display("Source path {} does not exist", path.best_effort_path_display()))]
    SourceMissing { path: PathBuf },
    #[snafu(display("Source path {} is not a directory", path.best_effort_path_display()))]
    SourceNotDirectory { path: PathBuf },
    #[snafu(display("Failed to read source path {}", path.best_effort_path_display()))]
    SourceUnreadable { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to list the source root"))]
    SourceListing { source: TreeReadError },
    #[snafu(display("Failed to create replica path {}", path.best_effort_path_display()))]
    ReplicaCreation { path: PathBuf, source: io::Error },
    #[snafu(display("Replica path {} is not a directory", path.best_effort_path_display()))]
    ReplicaNotDirectory { path: PathBuf },
}

impl ReconcileError {
    /// Source-side failures stop the scheduler; replica-side ones are retried next pass.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceMissing { .. }
                | Self::SourceNotDirectory { .. }
                | Self::SourceUnreadable { .. }
                | Self::SourceListing { .. }
        )
    }
}
