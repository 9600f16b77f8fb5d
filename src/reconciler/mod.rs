//! One-way tree reconciliation.
//!
//! [`Reconciler::reconcile`] is the whole synchronization algorithm; everything
//! else in the crate schedules it and reports what it did.

mod outcome;
mod reconciler;

pub use outcome::{ActionKind, SkippedEntry, SyncAction, SyncOutcome};
pub use reconciler::{ReconcileError, Reconciler};
