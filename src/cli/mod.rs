/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{AnalyzeArgs, CacheAction, Cli, Commands, OutputFormat};
pub use commands::handle_command;
