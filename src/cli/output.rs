//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{Entry, EntryDetails};

/// Shown in place of secret values unless `--reveal` is given.
const MASK: &str = "\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print search hits (Name, Folder, Id), at most `limit` rows.
pub fn print_entries_table<'a>(
    entries: &[Entry],
    folder_name: impl Fn(&str) -> &'a str,
    limit: usize,
) {
    if entries.is_empty() {
        info("No matching entries.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Folder", "Id"]);

    for entry in entries.iter().take(limit) {
        let folder = entry.folder_id.as_deref().map(&folder_name).unwrap_or("");
        table.add_row(vec![entry.name.as_str(), folder, entry.id.as_str()]);
    }

    println!("{table}");

    if entries.len() > limit {
        tip(&format!(
            "{} more match(es) not shown; refine the search or raise max-result-items.",
            entries.len() - limit
        ));
    }
}

/// Print one entry's fields. Secrets are masked unless `reveal` is set.
pub fn print_details_table(details: &EntryDetails, reveal: bool) {
    let secret = |value: &str| {
        if reveal {
            value.to_string()
        } else {
            MASK.to_string()
        }
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    if let Some(username) = &details.username {
        table.add_row(vec!["username".to_string(), username.clone()]);
    }
    if let Some(password) = &details.password {
        table.add_row(vec!["password".to_string(), secret(password)]);
    }
    if let Some(uri) = &details.uri {
        table.add_row(vec!["uri".to_string(), uri.clone()]);
    }
    if let Some(totp) = &details.totp {
        table.add_row(vec!["totp".to_string(), secret(totp)]);
    }
    for field in &details.custom_fields {
        let value = if field.is_hidden {
            secret(&field.value)
        } else {
            field.value.clone()
        };
        table.add_row(vec![field.name.clone(), value]);
    }

    if table.row_count() == 0 {
        info("This entry has no login fields.");
        return;
    }

    println!("{table}");
}
