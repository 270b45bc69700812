//! XDG Base Directory paths for labtrace.
//!
//! The CLI resolves its user configuration and shared presets the same way on every platform,
//! following the XDG layout rather than platform-native directories.

use std::path::PathBuf;

const APP_DIR: &str = "labtrace";

/// Get the labtrace config directory.
///
/// Returns `$XDG_CONFIG_HOME/labtrace` if set, otherwise `~/.config/labtrace`.
///
/// # Examples
///
/// ```
/// use labtrace_paths::config_dir;
///
/// let presets = config_dir().join("presets.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Path of the user config file, `config_dir()/config.toml`.
pub fn user_config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn xdg_dir(env_var: &str, home_fallback: &str) -> PathBuf {
    match std::env::var(env_var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => match dirs::home_dir() {
            Some(home) => home.join(home_fallback).join(APP_DIR),
            None => PathBuf::from(home_fallback).join(APP_DIR),
        },
    }
}
