//! Configuration inspection and bootstrap (`panoply config ...`).

use std::fs;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, DEFAULT_CONFIG_TEMPLATE};
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => show(global),
        ConfigCommand::Init => init(global),
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config::config_path);
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Print the fully resolved configuration with secrets redacted.
fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = config::load(global)?;
    if config.wildfire.api_key.is_some() {
        config.wildfire.api_key = Some("<redacted>".to_owned());
    }

    let rendered = toml::to_string_pretty(&config).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: e.to_string(),
    })?;
    print!("{rendered}");
    Ok(())
}

/// Write the commented default template, never clobbering an existing file.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = global.config.clone().unwrap_or_else(config::config_path);
    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
    println!("Wrote {}", path.display());
    Ok(())
}
