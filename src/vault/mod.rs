//! Vault module: what the caller sees of the credential store.
//!
//! This module provides:
//! - `Entry`, `EntryDetails` and `CustomField` records (`entry`)
//! - The per-session folder-name cache (`folders`)
//! - `QueryService` for search and entry details (`query`)

pub mod entry;
pub mod folders;
pub mod query;

// Re-export the most commonly used items.
pub use entry::{CustomField, Entry, EntryDetails};
pub use folders::FolderCache;
pub use query::{QueryService, MIN_QUERY_CHARS};
