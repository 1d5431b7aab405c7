pub mod config;
pub mod extract;
pub mod map;
pub mod output;

use std::path::Path;

use anyhow::{Context, Result};
use fieldlens::Config;

/// Load an explicit config file, or the default one with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
            Config::load_from(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Config::load().context("loading default config"),
    }
}
