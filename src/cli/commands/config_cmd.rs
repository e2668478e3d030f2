//! `vaultsearch config`: show or change settings.
//!
//! `config set` runs the change through the session manager so that, for
//! example, a new server URL first logs the old account out.

use crate::cli::output;
use crate::cli::{build_manager, config_path, Cli};
use crate::config::{transition, ConfigKey, Invalidation, Settings};
use crate::errors::{Result, VaultError};

/// Execute `vaultsearch config show`.
pub fn execute_show(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;
    let settings = Settings::load(&path)?;

    let rendered = toml::to_string_pretty(&settings)
        .map_err(|e| VaultError::SerializationError(format!("config: {e}")))?;

    output::info(&format!("Config file: {}", path.display()));
    println!("{rendered}");
    Ok(())
}

/// Execute `vaultsearch config set <key> <value>`.
pub fn execute_set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    let path = config_path(cli)?;
    let current = Settings::load(&path)?;

    let (updated, actions) = match build_manager(cli, current.clone()) {
        Ok(mut manager) => {
            let actions = manager.apply_config_change(key, value)?;
            (manager.settings().clone(), actions)
        }
        // The current settings may be exactly what is being fixed.
        Err(e) => {
            tracing::debug!(error = %e, "no usable backend; changing the file only");
            let t = transition(&current, key, value)?;
            (t.settings, t.actions)
        }
    };

    if actions.is_empty() && updated == current {
        output::info(&format!("{key} is unchanged."));
        return Ok(());
    }

    updated.save(&path)?;
    output::success(&format!("{key} updated."));

    if actions.contains(&Invalidation::LogoutPrevious) {
        output::tip("The previous account was logged out. Run `vaultsearch login` next.");
    } else if actions.contains(&Invalidation::ClearSession) {
        output::tip("The current session was cleared; unlock again before searching.");
    }
    Ok(())
}
