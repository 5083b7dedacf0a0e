//! Config file loader and serialization.

use super::ReleaseConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the global config path: ~/.config/cmrel/config.toml
pub fn get_global_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(".config/cmrel").join("config.toml"))
}

/// Load config from a `.json` or `.toml` file.
pub fn load_config_from_file(path: &Path) -> Result<ReleaseConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: ReleaseConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };

    config.validate()?;
    Ok(config)
}

/// Save config to a `.json` or `.toml` file, creating parent directories.
pub fn save_config_to_file(config: &ReleaseConfig, path: &Path) -> Result<(), ConfigError> {
    validate_config_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::to_string_pretty(config)
            .map_err(|e| ConfigError::ValidationFailed(format!("Failed to encode TOML: {}", e)))?,
        _ => serde_json::to_string_pretty(config)?,
    };

    fs::write(path, content)?;
    Ok(())
}

/// Resolve the configuration for a run.
///
/// An explicit path must exist. Without one, the global config file is used
/// when present, and built-in defaults otherwise.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ReleaseConfig, ConfigError> {
    if let Some(path) = explicit {
        log::debug!("[Config] Loading configuration from {}", path.display());
        return load_config_from_file(path);
    }

    match get_global_config_path() {
        Ok(global) if global.is_file() => {
            log::debug!("[Config] Loading global configuration from {}", global.display());
            load_config_from_file(&global)
        }
        _ => {
            log::debug!("[Config] No configuration file found, using built-in defaults");
            Ok(ReleaseConfig::default())
        }
    }
}

/// Validate config path (.json or .toml extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" || ext == "toml" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json or .toml extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json or .toml extension".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RevisionLookup;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/cmrel.json");

        let original = ReleaseConfig {
            bucket: "my-staging".to_string(),
            revision_lookup: RevisionLookup::GitRemote,
            access_token: Some("tok".to_string()),
            ..Default::default()
        };
        save_config_to_file(&original, &path).expect("Failed to save config");

        let loaded = load_config_from_file(&path).expect("Failed to load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "project = \"my-project\"\npoll_interval_secs = 30\nrevision_lookup = \"git-remote\"\n",
        )
        .unwrap();

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.project, "my-project");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.revision_lookup, RevisionLookup::GitRemote);
        assert_eq!(config.bucket, "cert-manager-release");
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"poll_interval_secs": 0}"#).unwrap();

        assert!(matches!(
            load_config_from_file(&path),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.json");
        fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(load_config_from_file(&path), Err(ConfigError::InvalidJson(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config_from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_config_path() {
        assert!(validate_config_path(Path::new("config.json")).is_ok());
        assert!(validate_config_path(Path::new("/tmp/config.toml")).is_ok());
        assert!(validate_config_path(Path::new("config.yaml")).is_err());
        assert!(validate_config_path(Path::new("config")).is_err());
        assert!(validate_config_path(Path::new("")).is_err());
    }

    #[test]
    fn test_resolve_explicit_path_must_exist() {
        let result = resolve_config(Some(Path::new("/nonexistent/cmrel.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
