//! The append-only record of what each synchronization pass did.

mod journal;

#[cfg(test)]
pub use journal::MemoryJournal;
pub use journal::{Journal, JournalError, LogFile};
