//! `vaultsearch shell`: launcher-style loop over one live session.
//!
//! Plain text is a search. Lines starting with `:` are commands:
//! `:show <id>`, `:copy <id> <field>`, `:sync`, `:lock`, `:help`, `:quit`.
//! The session is re-checked before every query, so an idle timeout or a
//! lock from another process leads to a fresh passphrase prompt.

use std::io::{self, BufRead, Write};

use console::style;

use crate::cli::commands::show::copy_field;
use crate::cli::output;
use crate::cli::{
    build_manager, ensure_unlocked, load_settings, warm_folders, Cli, CredentialPrompt, Manager,
    TerminalPrompt,
};
use crate::errors::{Result, VaultError};

const HELP: &str = "Type to search; :show <id>, :copy <id> <field>, :sync, :lock, :quit";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Empty,
    Search(&'a str),
    Show(&'a str),
    Copy { id: &'a str, field: &'a str },
    Sync,
    Lock,
    Help,
    Quit,
    Unknown(&'a str),
}

impl ShellCommand<'_> {
    fn needs_session(&self) -> bool {
        matches!(
            self,
            Self::Search(_) | Self::Show(_) | Self::Copy { .. } | Self::Sync
        )
    }
}

fn parse(line: &str) -> ShellCommand<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return if line.is_empty() {
            ShellCommand::Empty
        } else {
            ShellCommand::Search(line)
        };
    };

    let mut words = rest.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("show" | "s"), Some(id), None) => ShellCommand::Show(id),
        (Some("copy" | "c"), Some(id), Some(field)) => ShellCommand::Copy { id, field },
        (Some("sync"), None, _) => ShellCommand::Sync,
        (Some("lock"), None, _) => ShellCommand::Lock,
        (Some("help" | "h" | "?"), _, _) => ShellCommand::Help,
        (Some("quit" | "q" | "exit"), _, _) => ShellCommand::Quit,
        _ => ShellCommand::Unknown(line),
    }
}

/// Execute the `shell` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut manager = build_manager(cli, load_settings(cli)?)?;
    let prompt = TerminalPrompt;

    ensure_unlocked(&mut manager, &prompt)?;
    warm_folders(&mut manager);
    output::tip(HELP);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{} ", style("vault>").cyan().bold());
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match run_line(&mut manager, &prompt, &line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(VaultError::UserCancelled) => output::info("Cancelled."),
            Err(e) => output::error(&e.to_string()),
        }
    }

    Ok(())
}

/// Handle one input line; `false` ends the loop.
fn run_line(manager: &mut Manager, prompt: &dyn CredentialPrompt, line: &str) -> Result<bool> {
    let command = parse(line);

    if command.needs_session() {
        ensure_unlocked(manager, prompt)?;
    }

    match command {
        ShellCommand::Empty => {}
        ShellCommand::Search(query) => {
            let entries = manager.query().search(query)?;
            let limit = manager.settings().max_result_items;
            output::print_entries_table(&entries, |id| manager.folders().lookup(id), limit);
        }
        ShellCommand::Show(id) => {
            let details = manager.query().get_entry_details(id)?;
            output::print_details_table(&details, false);
        }
        ShellCommand::Copy { id, field } => {
            let details = manager.query().get_entry_details(id)?;
            copy_field(&details, field)?;
        }
        ShellCommand::Sync => {
            if manager.sync()? {
                output::success("Vault synced.");
            } else {
                output::warning("Sync failed.");
            }
        }
        ShellCommand::Lock => {
            manager.lock()?;
            output::success("Vault locked.");
        }
        ShellCommand::Help => output::tip(HELP),
        ShellCommand::Quit => return Ok(false),
        ShellCommand::Unknown(text) => {
            output::warning(&format!("Unknown command '{text}'."));
            output::tip(HELP);
        }
    }

    Ok(true)
}
