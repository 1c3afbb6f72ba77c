//! Default database location.

use std::path::PathBuf;

/// Default store path: `<cache dir>/te/tariff.db`.
pub fn default_db_path() -> PathBuf {
    user_cache_dir().join("te").join("tariff.db")
}

fn user_cache_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".cache");
    }
    std::env::temp_dir()
}
