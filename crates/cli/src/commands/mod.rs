pub mod chat;
pub mod check;
pub mod export;
pub mod init;
pub mod serve;

use std::path::{Path, PathBuf};

use doppel_config::AppConfig;

/// Load the config from an explicit path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Where the config file lives for this invocation.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}
