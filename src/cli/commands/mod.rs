pub mod auth;
pub mod completions;
pub mod config_cmd;
pub mod search;
pub mod shell;
pub mod show;
pub mod status;
pub mod sync;
