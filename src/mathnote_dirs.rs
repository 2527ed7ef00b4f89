//! Application directory paths for mathnote.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/mathnote/` | `~/.local/share/mathnote/` |
//! | Config | `~/Library/Application Support/mathnote/` | `~/.config/mathnote/` |
//!
//! # Environment Overrides
//!
//! - `MATHNOTE_DATA_DIR` overrides [`data_dir`]
//! - `MATHNOTE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory. Holds the history database.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MATHNOTE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("mathnote"))
        .unwrap_or_else(|| PathBuf::from("/tmp/mathnote-data"))
}

/// Application config directory. Honours `XDG_CONFIG_HOME` on Linux.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MATHNOTE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("mathnote"))
        .unwrap_or_else(|| PathBuf::from("/tmp/mathnote-config"))
}

/// `config.toml` inside [`config_dir`].
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// `history.db` inside [`data_dir`].
#[must_use]
pub fn history_db_file() -> PathBuf {
    data_dir().join("history.db")
}
