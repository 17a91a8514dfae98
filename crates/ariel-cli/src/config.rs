//! Loading the connection file and applying command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use secrecy::SecretString;

use ariel_common::ArielConfig;

/// Reads and parses a TOML connection file.
pub fn load_config(path: &Path) -> Result<ArielConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ArielConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    debug!("Loaded connection to {}", config.connection.host_port());
    Ok(config)
}

/// Flags given on the command line win over the file.
pub fn apply_overrides(
    config: &mut ArielConfig,
    sec_token: Option<String>,
    max_retries: Option<u32>,
) {
    if let Some(token) = sec_token {
        config.auth.sec = Some(SecretString::new(token.into()));
    }
    if let Some(max_retries) = max_retries {
        config.connection.options.retry.max_retries = max_retries;
    }
}
