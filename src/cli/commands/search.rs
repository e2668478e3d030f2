//! `vaultsearch search`: find entries by name.

use crate::cli::output;
use crate::cli::{build_manager, ensure_unlocked, load_settings, warm_folders, Cli, TerminalPrompt};
use crate::errors::Result;
use crate::vault::MIN_QUERY_CHARS;

/// Execute the `search` command.
pub fn execute(cli: &Cli, query: &str) -> Result<()> {
    if query.chars().count() < MIN_QUERY_CHARS {
        output::info(&format!(
            "Type at least {MIN_QUERY_CHARS} characters to search."
        ));
        return Ok(());
    }

    let mut manager = build_manager(cli, load_settings(cli)?)?;
    ensure_unlocked(&mut manager, &TerminalPrompt)?;
    warm_folders(&mut manager);

    let entries = manager.query().search(query)?;
    let limit = manager.settings().max_result_items;
    output::print_entries_table(&entries, |id| manager.folders().lookup(id), limit);
    Ok(())
}
