use std::path::Path;

use anyhow::Result;
use fieldlens::config::config_path;
use fieldlens::Config;

pub fn cmd_config(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let path = explicit.map_or_else(config_path, Path::to_path_buf);
    let status = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("# {}{status}", path.display());

    let key_status = if config.llm.api_key().is_some() {
        "set"
    } else {
        "not set"
    };
    println!("# API key ${}: {key_status}", config.llm.api_key_env);

    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
