use std::{
    fs, io,
    net::IpAddr,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_DNS_RESOLVER_1: &str = "1.1.1.1";
pub const DEFAULT_DNS_RESOLVER_2: &str = "8.8.8.8";

fn default_dns_resolver_1() -> String {
    DEFAULT_DNS_RESOLVER_1.to_string()
}

fn default_dns_resolver_2() -> String {
    DEFAULT_DNS_RESOLVER_2.to_string()
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Optional process settings. Every key has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_dns_resolver_1")]
    pub dns_resolver_1: String,
    #[serde(default = "default_dns_resolver_2")]
    pub dns_resolver_2: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dns_resolver_1: default_dns_resolver_1(),
            dns_resolver_2: default_dns_resolver_2(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if given. Any failure is logged and yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No settings file given, using defaults");
            return Settings::default();
        };
        match Settings::from_file(path) {
            Ok(settings) => settings,
            Err(err) => {
                error!(error = %err, "Failed to load settings file, using defaults");
                Settings::default()
            }
        }
    }

    /// Both resolvers as addresses; an entry that is not an IP falls back to its default.
    pub fn dns_resolvers(&self) -> [IpAddr; 2] {
        [
            parse_resolver(&self.dns_resolver_1, DEFAULT_DNS_RESOLVER_1),
            parse_resolver(&self.dns_resolver_2, DEFAULT_DNS_RESOLVER_2),
        ]
    }
}

fn parse_resolver(value: &str, fallback: &str) -> IpAddr {
    value.trim().parse().unwrap_or_else(|_| {
        warn!(resolver = %value, "Invalid dns resolver, using '{}'", fallback);
        fallback
            .parse()
            .unwrap_or(IpAddr::from([0, 0, 0, 0]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None);
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.dns_resolvers(),
            [IpAddr::from([1, 1, 1, 1]), IpAddr::from([8, 8, 8, 8])]
        );
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dns_resolver_1": "9.9.9.9"}"#).unwrap();

        let settings = Settings::load(Some(&path));
        assert_eq!(settings.dns_resolver_1, "9.9.9.9");
        assert_eq!(settings.dns_resolver_2, DEFAULT_DNS_RESOLVER_2);
    }

    #[test]
    fn test_broken_or_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Settings::from_file(&path), Err(SettingsError::Parse { .. })));
        assert_eq!(Settings::load(Some(&path)), Settings::default());

        let missing = dir.path().join("missing.json");
        assert!(matches!(Settings::from_file(&missing), Err(SettingsError::Read { .. })));
        assert_eq!(Settings::load(Some(&missing)), Settings::default());
    }

    #[test]
    fn test_invalid_resolver_falls_back() {
        let settings = Settings {
            dns_resolver_1: "resolver.local".to_string(),
            dns_resolver_2: "2001:4860:4860::8888".to_string(),
        };
        let [first, second] = settings.dns_resolvers();
        assert_eq!(first, IpAddr::from([1, 1, 1, 1]));
        assert!(second.is_ipv6());
    }
}
