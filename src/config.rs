//! Configuration file loading.
//!
//! The configuration types live in `skuforge_core::config`; this module
//! only finds, parses, and validates the file.

use anyhow::{Context, Result};
use skuforge_core::Config;
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {path:?}"))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {path:?}"))?;

    Ok(config)
}

/// Load config from default locations or return default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./skuforge.toml",
        "./config.toml",
        "~/.config/skuforge/config.toml",
        "/etc/skuforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // No file found: the defaults are a complete, valid configuration.
    Ok(Config::default())
}
