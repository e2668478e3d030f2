use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaultsearch::cli::{Cli, Commands, ConfigAction};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Status => vaultsearch::cli::commands::status::execute(&cli),
        Commands::Login { raw } => vaultsearch::cli::commands::auth::execute_login(&cli, raw),
        Commands::Unlock { raw } => vaultsearch::cli::commands::auth::execute_unlock(&cli, raw),
        Commands::Lock => vaultsearch::cli::commands::auth::execute_lock(&cli),
        Commands::Logout => vaultsearch::cli::commands::auth::execute_logout(&cli),
        Commands::Sync => vaultsearch::cli::commands::sync::execute(&cli),
        Commands::Search { ref query } => vaultsearch::cli::commands::search::execute(&cli, query),
        Commands::Show {
            ref id,
            reveal,
            ref copy,
        } => vaultsearch::cli::commands::show::execute(&cli, id, reveal, copy.as_deref()),
        Commands::Shell => vaultsearch::cli::commands::shell::execute(&cli),
        Commands::Config { ref action } => match action {
            ConfigAction::Show => vaultsearch::cli::commands::config_cmd::execute_show(&cli),
            ConfigAction::Set { ref key, ref value } => {
                vaultsearch::cli::commands::config_cmd::execute_set(&cli, key, value)
            }
        },
        Commands::Completions { ref shell } => {
            vaultsearch::cli::commands::completions::execute(shell)
        }
    };

    if let Err(e) = result {
        vaultsearch::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vaultsearch={log_level},warn")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
