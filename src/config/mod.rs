//! Configuration: the settings file and runtime key changes.

pub mod change;
pub mod settings;

pub use change::{transition, ConfigKey, ConfigTransition, Invalidation};
pub use settings::{FolderRefresh, Settings, Transport};
