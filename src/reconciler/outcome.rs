use std::fmt;
use std::path::{Path, PathBuf};

use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ActionKind {
    #[display("copy")]
    Copy,
    #[display("update")]
    Update,
    #[display("create-directory")]
    CreateDirectory,
    #[display("remove-file")]
    RemoveFile,
    #[display("remove-directory")]
    RemoveDirectory,
}

/// One mutation applied to the replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAction {
    pub kind: ActionKind,
    pub relative_path: PathBuf,
}

impl SyncAction {
    pub fn new(kind: ActionKind, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.relative_path.display();
        match self.kind {
            ActionKind::Copy => write!(f, "Copying file '{path}'."),
            ActionKind::Update => write!(f, "Updating file '{path}' (changed in source)."),
            ActionKind::CreateDirectory => write!(f, "Creating directory '{path}'."),
            ActionKind::RemoveFile => write!(f, "Removing file '{path}' from replica directory."),
            ActionKind::RemoveDirectory => {
                write!(f, "Removing directory '{path}' from replica directory.")
            }
        }
    }
}

/// An entry the pass gave up on. It is retried on the next pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub relative_path: PathBuf,
    pub operation: &'static str,
    pub reason: String,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to {} '{}': {}. Skipping.",
            self.operation,
            self.relative_path.display(),
            self.reason
        )
    }
}

/// Everything a single pass did, in the order it did it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    actions: Vec<SyncAction>,
    skipped: Vec<SkippedEntry>,
}

impl SyncOutcome {
    pub(super) fn push_action(&mut self, action: SyncAction) {
        self.actions.push(action);
    }

    pub(super) fn push_skipped(&mut self, skipped: SkippedEntry) {
        self.skipped.push(skipped);
    }

    pub fn actions(&self) -> &[SyncAction] {
        &self.actions
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// True when the pass changed nothing in the replica.
    pub fn is_unchanged(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }

    fn paths_of(&self, kinds: &[ActionKind]) -> Vec<String> {
        self.actions
            .iter()
            .filter(|a| kinds.contains(&a.kind))
            .map(|a| a.relative_path.display().to_string())
            .collect()
    }

    /// Journal lines closing a pass.
    pub fn summary_lines(&self, replica_root: &Path) -> Vec<String> {
        let mut lines = Vec::new();

        if self.is_unchanged() {
            lines.push("No changes were made during synchronization.".to_string());
        } else {
            lines.push(format!(
                "Sync complete. {} files copied/updated, {} directories created, {} files removed, {} directories removed from '{}'.",
                self.count(ActionKind::Copy) + self.count(ActionKind::Update),
                self.count(ActionKind::CreateDirectory),
                self.count(ActionKind::RemoveFile),
                self.count(ActionKind::RemoveDirectory),
                replica_root.display()
            ));

            let details = [
                ("Copied/Updated files", &[ActionKind::Copy, ActionKind::Update][..]),
                ("Created directories", &[ActionKind::CreateDirectory][..]),
                ("Removed files", &[ActionKind::RemoveFile][..]),
                ("Removed directories", &[ActionKind::RemoveDirectory][..]),
            ];
            for (label, kinds) in details {
                let paths = self.paths_of(kinds);
                if !paths.is_empty() {
                    lines.push(format!("{label}: {}", paths.join(", ")));
                }
            }
        }

        if !self.skipped.is_empty() {
            lines.push(format!(
                "{} entries could not be synchronized and will be retried next pass.",
                self.skipped.len()
            ));
        }

        lines
    }
}
