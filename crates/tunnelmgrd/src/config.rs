//! Configuration file support for tunnelmgrd
//!
//! Loads tunnelmgrd settings from a TOML file.
//! Default location: /etc/sonic/tunnelmgrd.conf, overridden by the
//! `TUNNELMGRD_CONFIG` environment variable.

use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{CfgMgrError, CfgMgrResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/tunnelmgrd.conf";

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_ENV: &str = "TUNNELMGRD_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelMgrConfig {
    /// JSON snapshot of the configuration being committed
    #[serde(default = "default_current_config")]
    pub current_config: PathBuf,

    /// JSON snapshot of the configuration applied by the previous run
    #[serde(default = "default_effective_config")]
    pub effective_config: PathBuf,

    /// Log `ip`/`sysctl` commands instead of running them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_current_config() -> PathBuf {
    PathBuf::from("/var/run/tunnelmgrd/current.json")
}

fn default_effective_config() -> PathBuf {
    PathBuf::from("/var/run/tunnelmgrd/effective.json")
}

impl Default for TunnelMgrConfig {
    fn default() -> Self {
        Self {
            current_config: default_current_config(),
            effective_config: default_effective_config(),
            dry_run: false,
        }
    }
}

impl TunnelMgrConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> CfgMgrResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CfgMgrError::config_store(
                    path.display().to_string(),
                    format!("failed to parse config file: {}", e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(CfgMgrError::config_store(
                path.display().to_string(),
                e.to_string(),
            )),
        }
    }

    /// Load from `TUNNELMGRD_CONFIG` or the default location
    pub fn load() -> CfgMgrResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TunnelMgrConfig::default();
        assert!(!config.dry_run);
        assert_eq!(
            config.effective_config,
            PathBuf::from("/var/run/tunnelmgrd/effective.json")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunnelMgrConfig::load_or_default(dir.path().join("absent.conf")).unwrap();
        assert_eq!(config, TunnelMgrConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dry_run = true").unwrap();
        writeln!(file, "current_config = \"/tmp/current.json\"").unwrap();

        let config = TunnelMgrConfig::load_or_default(file.path()).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.current_config, PathBuf::from("/tmp/current.json"));
        assert_eq!(config.effective_config, default_effective_config());
    }

    #[test]
    fn test_invalid_file_is_store_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dry_run = \"sometimes\"").unwrap();

        let err = TunnelMgrConfig::load_or_default(file.path()).unwrap_err();
        assert!(matches!(err, CfgMgrError::ConfigStore { .. }));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_unreadable_path_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TunnelMgrConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, CfgMgrError::ConfigStore { .. }));
    }
}
