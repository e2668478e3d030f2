use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in VaultSearch.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Credential store errors ---
    #[error("Cannot find or execute `{0}` (make sure it is installed and accessible)")]
    ToolNotFound(String),

    #[error("Cannot find or access the database file {0}")]
    DatabaseFileNotFound(PathBuf),

    #[error("Vault is locked, enter your master password to unlock it")]
    VaultLocked,

    /// Failure reported by the credential store, passed through verbatim.
    #[error("{0}")]
    CliError(String),

    #[error("Local vault service error: {0}")]
    Transport(String),

    // --- Config errors ---
    #[error("Config error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl VaultError {
    /// Returns `true` for conditions the user can fix by entering a passphrase.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::VaultLocked)
    }
}

/// Convenience type alias for VaultSearch results.
pub type Result<T> = std::result::Result<T, VaultError>;
