//! `vaultsearch login|unlock|lock|logout`: session lifecycle.
//!
//! A session only lives as long as the process that opened it. To carry
//! it over, print it with `--raw` and export it as `VAULTSEARCH_SESSION`,
//! or configure a `session_persist_command`.

use crate::cli::output;
use crate::cli::{build_manager, ensure_unlocked, load_settings, Cli, Manager, TerminalPrompt};
use crate::errors::Result;

/// Execute `vaultsearch login`.
pub fn execute_login(cli: &Cli, raw: bool) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;

    if !manager.store().has_accounts() {
        output::info(&format!(
            "{} has no account login; unlocking the database instead.",
            manager.store()
        ));
    } else if !manager.needs_login()? {
        output::info("Already logged in.");
    }

    ensure_unlocked(&mut manager, &TerminalPrompt)?;
    report_session(&manager, raw);
    Ok(())
}

/// Execute `vaultsearch unlock`.
pub fn execute_unlock(cli: &Cli, raw: bool) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    ensure_unlocked(&mut manager, &TerminalPrompt)?;
    report_session(&manager, raw);
    Ok(())
}

/// Execute `vaultsearch lock`.
pub fn execute_lock(cli: &Cli) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    if manager.lock()? {
        output::success("Vault locked.");
    } else {
        output::warning("The credential store did not confirm the lock; the session was dropped.");
    }
    Ok(())
}

/// Execute `vaultsearch logout`.
pub fn execute_logout(cli: &Cli) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    manager.logout()?;
    output::success("Logged out.");
    Ok(())
}

fn report_session(manager: &Manager, raw: bool) {
    if raw {
        if let Some(token) = manager.token() {
            println!("{token}");
            return;
        }
        output::warning("This store has no session token to print.");
    }

    output::success("Vault unlocked.");
    if manager.token().is_some() && manager.settings().session_persist_command.is_none() {
        output::tip(
            "The session ends with this command. Export `vaultsearch unlock --raw` as \
             VAULTSEARCH_SESSION or use `vaultsearch shell` to keep it.",
        );
    }
}
