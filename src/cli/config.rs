//! Configuration CLI command handlers

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::{Config, ConfigField};
use crate::error::Result;

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(key, value),
        ConfigCommand::Get { key } => handle_get(key),
        ConfigCommand::Remove { key } => handle_remove(key),
    }
}

fn key_name(key: ConfigKey) -> String {
    clap::ValueEnum::to_possible_value(&key)
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{:?}", key))
}

/// Handle setting a configuration value
fn handle_set(key: ConfigKey, value: String) -> Result<()> {
    let mut config = Config::load()?;
    config.set(ConfigField::from(key), &value)?;
    config.save()?;

    println!("{} set to: {}", key_name(key), value);
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(key: ConfigKey) -> Result<()> {
    let config = Config::load()?;
    let value = config.get(ConfigField::from(key));

    if value.is_empty() {
        println!("{}: Not configured", key_name(key));
    } else {
        println!("{}: {}", key_name(key), value);
    }
    Ok(())
}

/// Handle removing a configuration value
fn handle_remove(key: ConfigKey) -> Result<()> {
    let mut config = Config::load()?;
    config.reset(ConfigField::from(key));
    config.save()?;

    let value = config.get(ConfigField::from(key));
    if value.is_empty() {
        println!("{} has been removed.", key_name(key));
    } else {
        println!("{} reset to default: {}", key_name(key), value);
    }
    Ok(())
}
