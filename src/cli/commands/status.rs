//! `vaultsearch status`: where the store stands, without prompting.

use crate::cli::output;
use crate::cli::{build_manager, load_settings, Cli};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;

    output::info(&format!(
        "Store: {} ({})",
        manager.store(),
        manager.invoker().target()
    ));
    if let Some(db) = manager.settings().database_path() {
        output::info(&format!("Database: {}", db.display()));
    }

    if manager.needs_login()? {
        output::warning("Not logged in.");
        output::tip("Run `vaultsearch login` to log in.");
        return Ok(());
    }

    let locked = match manager.needs_unlock() {
        Ok(needed) => needed,
        Err(e) if e.is_locked() => true,
        Err(e) => return Err(e),
    };

    if locked {
        output::info("Locked.");
        output::tip("Run `vaultsearch unlock` or `vaultsearch shell`.");
        return Ok(());
    }

    output::success("Unlocked.");
    if let Some(deadline) = manager.expires_at() {
        output::info(&format!(
            "Session idles out at {}",
            deadline.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    Ok(())
}
