//! Configuration loading

use tracing::info;

use crate::{Config, Error, Result};

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. `explicit_path` (must exist)
/// 2. `GSG_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. Fall back to environment variables only
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    if let Some(path) = explicit_path {
        if !std::path::Path::new(path).exists() {
            return Err(Error::InvalidInput(format!("Config file not found: {path}")));
        }
    }

    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| {
            std::env::var("GSG_CONFIG_PATH")
                .ok()
                .filter(|p| std::path::Path::new(p).exists())
        })
        .or_else(|| {
            let cwd = "config.yaml";
            std::path::Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = match config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path)?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    config.validate().map_err(|errors| {
        Error::InvalidInput(format!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ))
    })?;

    info!("Configuration loaded and validated successfully");
    Ok(config)
}
