//! Per-pass views of a directory tree.
//!
//! Nothing here is cached: every lookup goes back to the filesystem, so each
//! synchronization pass sees the trees as they are at that moment.

mod tree;

pub use tree::{EntryKind, PathEntry, TreeReadError, read_children, read_children_in_place};
