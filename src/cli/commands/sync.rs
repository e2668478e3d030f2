//! `vaultsearch sync`: pull remote changes.

use crate::cli::output;
use crate::cli::{build_manager, ensure_unlocked, load_settings, Cli, TerminalPrompt};
use crate::errors::{Result, VaultError};

/// Execute the `sync` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    ensure_unlocked(&mut manager, &TerminalPrompt)?;

    if !manager.sync()? {
        return Err(VaultError::CommandFailed(
            "the credential store could not sync".into(),
        ));
    }

    output::success(&format!(
        "Vault synced ({} folder(s)).",
        manager.folders().len()
    ));
    Ok(())
}
