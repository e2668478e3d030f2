//! Entry and EntryDetails types returned by the query service.
//!
//! `Entry` is a lightweight search handle.  `EntryDetails` carries the
//! actual secrets; its memory is wiped on drop and it is never cached.

use std::fmt;

use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Store-specific identifier (item id, or entry path for file stores).
    pub id: String,
    pub name: String,
    /// Folder reference, resolved through the folder cache for display.
    pub folder_id: Option<String>,
}

/// A user-defined attribute on an entry.
#[derive(Clone, PartialEq, Eq, Serialize, Zeroize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
    pub is_hidden: bool,
}

impl fmt::Debug for CustomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: &str = if self.is_hidden { "<hidden>" } else { &self.value };
        f.debug_struct("CustomField")
            .field("name", &self.name)
            .field("value", &value)
            .field("is_hidden", &self.is_hidden)
            .finish()
    }
}

/// Full details of one entry, fetched on demand.
///
/// Fields the entry does not have are `None` (or an empty field list),
/// not errors.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct EntryDetails {
    pub username: Option<String>,
    pub password: Option<String>,
    pub uri: Option<String>,
    pub totp: Option<String>,
    pub custom_fields: Vec<CustomField>,
}

impl EntryDetails {
    /// Look up a copyable value by field name (`username`, `password`,
    /// `uri`, `totp`, or a custom field name).
    pub fn field(&self, name: &str) -> Option<&str> {
        match name.to_lowercase().as_str() {
            "username" | "user" => self.username.as_deref(),
            "password" | "pass" => self.password.as_deref(),
            "uri" | "url" => self.uri.as_deref(),
            "totp" | "otp" => self.totp.as_deref(),
            _ => self
                .custom_fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.value.as_str()),
        }
    }
}

// Secrets never show up in debug output or logs.
impl fmt::Debug for EntryDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDetails")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("uri", &self.uri)
            .field("totp", &self.totp.as_ref().map(|_| "<redacted>"))
            .field("custom_fields", &self.custom_fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryDetails {
        EntryDetails {
            username: Some("alice".into()),
            password: Some("correct horse".into()),
            uri: Some("https://example.com".into()),
            totp: None,
            custom_fields: vec![CustomField {
                name: "PIN".into(),
                value: "1234".into(),
                is_hidden: true,
            }],
        }
    }

    #[test]
    fn field_lookup_by_alias_and_custom_name() {
        let details = sample();
        assert_eq!(details.field("password"), Some("correct horse"));
        assert_eq!(details.field("URL"), Some("https://example.com"));
        assert_eq!(details.field("PIN"), Some("1234"));
        assert_eq!(details.field("totp"), None);
        assert_eq!(details.field("missing"), None);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let printed = format!("{:?}", sample());
        assert!(printed.contains("alice"));
        assert!(!printed.contains("correct horse"));
        assert!(!printed.contains("1234"));
    }
}
