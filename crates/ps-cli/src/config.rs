use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use ps_core::pinning::{IpMatchMode, PinningVerifier};
use ps_core::policy::{DomainPolicyRecord, GlobalDefaults};
use ps_core::store::DomainPolicyStore;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Policy configuration: global defaults plus per-domain records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lists_dir: Option<PathBuf>,
    pub ip_match: IpMatchMode,
    pub defaults: GlobalDefaults,
    pub domains: Vec<DomainPolicyRecord>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise use the browser defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn store(&self) -> DomainPolicyStore {
        DomainPolicyStore::from_records(self.domains.iter().cloned())
    }

    pub fn verifier(&self) -> PinningVerifier {
        PinningVerifier::new(self.ip_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::policy::Tristate;

    #[test]
    fn test_parses_full_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "lists_dir": "assets/blocklists",
                "ip_match": "overlap",
                "defaults": { "javascript": false, "font_size": 110 },
                "domains": [
                    { "domain": "*.example.com", "javascript": 1, "night_mode": "enabled" },
                    { "domain": "bank.example",
                      "pins": { "ip_addresses": ["192.0.2.1"] } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.lists_dir.as_deref(), Some(Path::new("assets/blocklists")));
        assert_eq!(config.ip_match, IpMatchMode::Overlap);
        assert_eq!(config.defaults.font_size, 110);
        assert!(config.defaults.easylist);

        let store = config.store();
        assert_eq!(store.len(), 2);
        let record = store.lookup("www.example.com").unwrap();
        assert_eq!(record.javascript, Tristate::Enabled);
        assert_eq!(record.night_mode, Tristate::Enabled);
        assert!(store.lookup("bank.example").unwrap().pins.ip_addresses.is_some());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.defaults, GlobalDefaults::default());
        assert_eq!(config.ip_match, IpMatchMode::Exact);
        assert!(config.store().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/ps-cli.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
