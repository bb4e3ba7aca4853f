mod cli;
mod config;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use deskshell_core::{
    settings::Settings,
    storage::{EncryptionProvider, FileSystem},
};
use deskshell_settings::{LoadSource, SettingsStore};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the settings store.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or(cli::Command::Show) {
        cli::Command::Show => {
            let store = storage::store_from_config(&config)?;
            println!("{}", render(&store.load())?);
        }
        cli::Command::Get { key } => {
            let store = storage::store_from_config(&config)?;
            println!("{}", run_get(&store, &key)?);
        }
        cli::Command::Set { key, value } => {
            let store = storage::store_from_config(&config)?;
            let settings = run_set(&store, &key, &value)?;
            println!("{}", render(&settings)?);
        }
        cli::Command::Reset => {
            let store = storage::store_from_config(&config)?;
            if !store.delete() {
                color_eyre::eyre::bail!("failed to delete stored settings");
            }
            println!("Settings reset to defaults");
        }
        cli::Command::Health => {
            let store = storage::store_from_config(&config)?;
            print!("{}", health_report(&store));
        }
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("deskshell {}", env!("CARGO_PKG_VERSION"));
}

fn render(settings: &Settings) -> Result<String> {
    Ok(serde_json::to_string_pretty(settings)?)
}

/// Current value of one setting, as JSON.
fn run_get<E, F>(store: &SettingsStore<E, F>, key: &str) -> Result<Value>
where
    E: EncryptionProvider,
    F: FileSystem,
{
    store
        .load()
        .get(key)
        .ok_or_else(|| color_eyre::eyre::eyre!("unknown setting `{key}`"))
}

/// Load, change one field, save straight away.
fn run_set<E, F>(store: &SettingsStore<E, F>, key: &str, raw: &str) -> Result<Settings>
where
    E: EncryptionProvider,
    F: FileSystem,
{
    let value = parse_value(raw);
    let mut settings = store.load();
    settings
        .set(key, value)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    store
        .try_save(&settings)
        .map_err(|e| color_eyre::eyre::eyre!("failed to save settings: {e}"))?;
    Ok(settings)
}

/// JSON literal if it parses, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn health_report<E, F>(store: &SettingsStore<E, F>) -> String
where
    E: EncryptionProvider,
    F: FileSystem,
{
    let location = store.location();
    let (current_exists, legacy_exists) = store.files_present();
    let status = match store.load_report().source {
        LoadSource::Defaults => "defaults (nothing stored)".to_string(),
        LoadSource::Current => "encrypted".to_string(),
        LoadSource::Legacy => "plaintext".to_string(),
        LoadSource::Migrated => "migrated from plaintext".to_string(),
        LoadSource::Fallback(err) => format!("defaults ({err})"),
    };
    let mut out = String::new();
    out.push_str(&format!(
        "Encrypted file: {} ({})\n",
        location.current.display(),
        presence(current_exists)
    ));
    out.push_str(&format!(
        "Plaintext file: {} ({})\n",
        location.legacy.display(),
        presence(legacy_exists)
    ));
    out.push_str(&format!(
        "Encryption: {}\n",
        if store.encryption_available() {
            "available"
        } else {
            "unavailable"
        }
    ));
    out.push_str(&format!("Settings: {status}\n"));
    out
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "absent"
    }
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
