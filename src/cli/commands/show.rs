//! `vaultsearch show`: print or copy one entry's fields.

use crate::cli::output;
use crate::cli::{build_manager, ensure_unlocked, load_settings, Cli, TerminalPrompt};
use crate::errors::{Result, VaultError};
use crate::vault::EntryDetails;

/// Execute the `show` command.
pub fn execute(cli: &Cli, id: &str, reveal: bool, copy: Option<&str>) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    ensure_unlocked(&mut manager, &TerminalPrompt)?;

    let details = manager.query().get_entry_details(id)?;

    match copy {
        Some(field) => copy_field(&details, field),
        None => {
            output::print_details_table(&details, reveal);
            Ok(())
        }
    }
}

/// Put one field of `details` on the system clipboard.
pub fn copy_field(details: &EntryDetails, field: &str) -> Result<()> {
    let value = details
        .field(field)
        .ok_or_else(|| VaultError::CommandFailed(format!("entry has no '{field}' field")))?;

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| VaultError::CommandFailed(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(value.to_string())
        .map_err(|e| VaultError::CommandFailed(format!("clipboard write failed: {e}")))?;

    output::success(&format!("Copied {field} to the clipboard."));
    Ok(())
}
