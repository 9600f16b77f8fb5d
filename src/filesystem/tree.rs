use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use derive_more::Display;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::ext::BestEffortPathExt;

/// Represents the type of a filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
    /// Symbolic links, sockets, fifos and devices, seen without following links.
    #[display("special file")]
    Special,
}

/// A single node of a tree, keyed by its path relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    pub modified_time: Option<SystemTime>,
    /// The node is a symbolic link. Linked directories are mirrored but never descended into.
    pub is_link: bool,
}

impl PathEntry {
    /// Looks up `relative` under `root` without following a final symbolic link.
    ///
    /// Returns `Ok(None)` when nothing exists at that path.
    pub fn lookup(root: &Path, relative: &Path) -> io::Result<Option<Self>> {
        let metadata = match fs::symlink_metadata(root.join(relative)) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        Ok(Some(Self::in_place(relative.to_path_buf(), &metadata)))
    }

    fn in_place(relative_path: PathBuf, metadata: &fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Special
        };

        Self {
            relative_path,
            kind,
            modified_time: metadata.modified().ok(),
            is_link: file_type.is_symlink(),
        }
    }

    /// Returns true if anything, including a dangling link, occupies `relative` under `root`.
    ///
    /// Errors other than "not found" count as present, so an unreadable source
    /// entry never causes its replica counterpart to be deleted.
    pub fn exists(root: &Path, relative: &Path) -> bool {
        match fs::symlink_metadata(root.join(relative)) {
            Ok(_) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => {
                debug!(
                    "Treating {} as present after lookup failure: {}",
                    root.join(relative).best_effort_path_display(),
                    err
                );
                true
            }
        }
    }
}

fn kind_of(metadata: &fs::Metadata) -> EntryKind {
    if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

/// Lists the immediate children of `relative` under `root`, sorted by name,
/// following symbolic links the way a plain recursive copy would.
///
/// Entries that vanish while being listed, dangling links and special files
/// (sockets, fifos, devices) are left out.
pub fn read_children(root: &Path, relative: &Path) -> Result<Vec<PathEntry>, TreeReadError> {
    list(root, relative, describe)
}

/// Lists the immediate children of `relative` under `root`, sorted by name,
/// exactly as they are on disk.
///
/// Nothing is followed and nothing is filtered: links, sockets and fifos come
/// back as [`EntryKind::Special`].
pub fn read_children_in_place(
    root: &Path,
    relative: &Path,
) -> Result<Vec<PathEntry>, TreeReadError> {
    list(root, relative, |entry, relative_path| {
        let metadata = fs::symlink_metadata(entry.path())?;
        Ok(Some(PathEntry::in_place(relative_path, &metadata)))
    })
}

fn list(
    root: &Path,
    relative: &Path,
    describe_entry: impl Fn(&fs::DirEntry, PathBuf) -> io::Result<Option<PathEntry>>,
) -> Result<Vec<PathEntry>, TreeReadError> {
    let directory = root.join(relative);
    let read_dir = fs::read_dir(&directory).context(ReadDirSnafu {
        path: directory.clone(),
    })?;

    let mut children = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(
                    "Failed to read an entry of {}: {}",
                    directory.best_effort_path_display(),
                    err
                );
                None
            }
        })
        .filter_map(|entry| {
            let relative_path = relative.join(entry.file_name());
            match describe_entry(&entry, relative_path) {
                Ok(described) => described,
                Err(err) => {
                    warn!(
                        "Skipping {}: {}",
                        entry.path().best_effort_path_display(),
                        err
                    );
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    children.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(children)
}

fn describe(entry: &fs::DirEntry, relative_path: PathBuf) -> io::Result<Option<PathEntry>> {
    let file_type = entry.file_type()?;

    let (metadata, is_link) = if file_type.is_symlink() {
        (fs::metadata(entry.path())?, true)
    } else {
        (entry.metadata()?, false)
    };

    if !metadata.is_dir() && !metadata.is_file() {
        debug!(
            "Ignoring special file {}",
            entry.path().best_effort_path_display()
        );
        return Ok(None);
    }

    Ok(Some(PathEntry {
        relative_path,
        kind: kind_of(&metadata),
        modified_time: metadata.modified().ok(),
        is_link,
    }))
}

#[derive(Debug, Snafu)]
pub enum TreeReadError {
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ReadDirError { path: PathBuf, source: io::Error },
}
