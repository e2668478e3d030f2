use std::collections::HashMap;

/// Folder id -> display name, valid for the current session only.
///
/// The map is only ever swapped wholesale; entries from one refresh never
/// survive into the next.
#[derive(Debug, Default, Clone)]
pub struct FolderCache {
    names: HashMap<String, String>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping with a fresh listing.
    pub fn replace(&mut self, names: HashMap<String, String>) {
        tracing::debug!(count = names.len(), "folder cache refreshed");
        self.names = names;
    }

    pub fn clear(&mut self) {
        if !self.names.is_empty() {
            tracing::debug!(count = self.names.len(), "folder cache cleared");
        }
        self.names.clear();
    }

    /// Name for `id`, or `""` for folders we do not know (deleted since
    /// the last sync, or no folder at all).
    pub fn lookup(&self, id: &str) -> &str {
        self.names.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
