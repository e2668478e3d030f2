//! Query service: search and entry details on an unlocked session.
//!
//! Results are never cached: every search and every detail lookup goes to
//! the store, so a locked or expired session can never serve stale data.

use crate::errors::Result;
use crate::invoker::Invoker;
use crate::session::SessionManager;
use crate::store::{StoreCommand, NO_RESULTS_MARKER, NO_TOTP_MARKER};

use super::{Entry, EntryDetails};

/// Shorter queries return nothing without asking the store.
pub const MIN_QUERY_CHARS: usize = 2;

/// TOTP failures that mean "this entry has no usable code".
const TOTP_UNAVAILABLE: &[&str] = &[NO_TOTP_MARKER, "premium"];

pub struct QueryService<'a, I: Invoker> {
    session: &'a mut SessionManager<I>,
}

impl<'a, I: Invoker> QueryService<'a, I> {
    pub fn new(session: &'a mut SessionManager<I>) -> Self {
        Self { session }
    }

    /// Entries matching `query`, in the order the store returned them.
    ///
    /// An empty result from the store is an empty list, not an error.
    pub fn search(&mut self, query: &str) -> Result<Vec<Entry>> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let outcome = self.session.run_with_session(&StoreCommand::Search { query })?;
        if outcome.failure_contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }

        let entries = self.session.store().parse_entries(&outcome.into_payload()?)?;
        tracing::debug!(hits = entries.len(), "search finished");
        Ok(entries)
    }

    /// Full details of one entry.
    ///
    /// Fields the entry lacks are left empty. Fails with `VaultLocked`
    /// when there is no session.
    pub fn get_entry_details(&mut self, id: &str) -> Result<EntryDetails> {
        let payload = self
            .session
            .run_with_session(&StoreCommand::GetItem { id })?
            .into_payload()?;
        let (mut details, needs_totp) = self.session.store().parse_details(&payload)?;

        if needs_totp {
            let outcome = self.session.run_with_session(&StoreCommand::GetTotp { id })?;
            if TOTP_UNAVAILABLE.iter().any(|m| outcome.failure_contains(m)) {
                tracing::debug!(message = ?outcome.failure_message(), "entry has no usable TOTP");
            } else {
                details.totp = self.session.store().parse_totp(&outcome.into_payload()?);
            }
        }

        Ok(details)
    }

    /// Display name of a folder, `""` when unknown.
    pub fn lookup_folder(&self, id: &str) -> &str {
        self.session.folders().lookup(id)
    }
}
