//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution:
//! `~/.config/canticle/` on Linux (honouring `XDG_CONFIG_HOME`),
//! `~/Library/Application Support/canticle/` on macOS.
//!
//! Set `CANTICLE_CONFIG_DIR` to override the config directory for tests or
//! custom deployments.

use std::path::PathBuf;

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("CANTICLE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("canticle"))
        .unwrap_or_else(|| PathBuf::from("/tmp/canticle-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
