use clap::{Parser, Subcommand};

/// CLI surface for the desktop shell's settings store.
#[derive(Parser, Debug)]
#[command(
    name = "deskshell",
    about = "Desktop shell settings (encrypted at rest)",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to showing the current settings.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the settings in effect as JSON.
    Show,
    /// Print one setting as JSON.
    Get {
        /// Setting name, e.g. `startMinimized`.
        key: String,
    },
    /// Change one setting and save immediately.
    Set {
        /// Setting name, e.g. `minimizeToTray`.
        key: String,
        /// JSON value (`true`, `3`, `"dark"`); bare words are taken as strings.
        value: String,
    },
    /// Delete all stored settings (encrypted and plaintext).
    Reset,
    /// Report storage paths, keystore availability and load status.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
