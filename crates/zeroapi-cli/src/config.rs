//! Configuration file loading for the CLI
//!
//! This module finds and loads the TOML configuration from an explicit
//! path, the working directory or the platform configuration directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use zeroapi::config::AppConfig;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = ".zeroapi.toml";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse TOML configuration `{}`: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("cannot read configuration `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. `.zeroapi.toml` in the working directory
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be read or parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path:% = path.display(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG);
    if local_config.exists() {
        info!(path:% = local_config.display(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("dev", "zeroapi", "zeroapi") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path:% = system_config.display(); "Loading configuration from system path");
            return load_config_file(&system_config);
        }

        debug!(path:% = system_config.display(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zeroapi::NamingStyle;

    #[test]
    fn test_explicit_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("zeroapi.toml");
        fs::write(&path, "[gen]\nstyle = \"goZero\"\n").expect("write");

        let config = load_config(Some(&path)).expect("load");
        assert_eq!(config.gen_config().style(), NamingStyle::Camel);
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempdir().expect("tempdir");
        let result = load_config(Some(dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[check]\ndeny_warnings = \"maybe\"\n").expect("write");

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
