//! `averygate config`: Print the effective configuration.

use averygate_config::AppConfig;
use std::path::Path;

/// Render the configuration as TOML with credentials redacted.
pub fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&config.redacted())
}

pub fn run(config_path: Option<&Path>, defaults: bool) -> Result<(), Box<dyn std::error::Error>> {
    if defaults {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let path = AppConfig::resolve_path(config_path);
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("# source: {}", path.display());
    print!("{}", render(&config)?);
    Ok(())
}
