//! Configuration file helpers
//!
//! The configuration is a single JSON document, replaced as a whole on write.

use anyhow::{Context, Result, ensure};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::AdapterConfig;

/// Check that a configuration can be used to reach a core.
pub fn validate(config: &AdapterConfig) -> Result<()> {
    ensure!(!config.host.trim().is_empty(), "host must not be empty");
    ensure!(config.port != 0, "port must not be 0");
    ensure!(config.max_attempts >= 1, "max_attempts must be at least 1");
    ensure!(
        !config.heartbeat_method.is_empty(),
        "heartbeat_method must not be empty"
    );
    Ok(())
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<AdapterConfig> {
    let data = fs::read(path).with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: AdapterConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;

    validate(&config).with_context(|| format!("Invalid config: {:?}", path))?;
    Ok(config)
}

/// Validate and write a configuration file.
pub fn write_config(path: &Path, config: &AdapterConfig) -> Result<()> {
    validate(config)?;
    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    write_atomic(path, &json)
}

/// Replace `path` with `data` in one step.
///
/// The data is staged in a temp file next to `path`, so the final rename never
/// crosses a filesystem.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage config in {:?}", dir))?;
    staged.write_all(data).context("Failed to write config")?;
    staged.as_file().sync_all().context("Failed to sync config")?;
    staged
        .persist(path)
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}
