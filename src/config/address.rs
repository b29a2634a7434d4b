use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::mock::url::normalize;

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?P<host>[^:/\s]*):(?P<port>[0-9]*)(?P<prefix>/.*)?$")
        .expect("address pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid url '{0}', use format: host:port[/prefix]")]
    Malformed(String),
    #[error("host is missing in '{0}', use format: host:port[/prefix]")]
    MissingHost(String),
    #[error("port is missing or invalid in '{0}', use format: host:port[/prefix]")]
    InvalidPort(String),
}

/// Where the server listens and which path prefix every mock url gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
    /// Normalized; empty when no prefix was given.
    pub prefix: String,
}

impl ListenAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let caps = ADDRESS_PATTERN
            .captures(raw.trim())
            .ok_or_else(|| AddressError::Malformed(raw.to_string()))?;

        let host = caps.name("host").map(|m| m.as_str()).unwrap_or("");
        if host.is_empty() {
            return Err(AddressError::MissingHost(raw.to_string()));
        }
        let port = caps
            .name("port")
            .and_then(|m| m.as_str().parse::<u16>().ok())
            .filter(|port| *port != 0)
            .ok_or_else(|| AddressError::InvalidPort(raw.to_string()))?;
        let prefix = normalize(caps.name("prefix").map(|m| m.as_str()).unwrap_or(""));

        Ok(ListenAddress {
            host: host.to_string(),
            port,
            prefix,
        })
    }

    /// `host:port`, the socket address handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for ListenAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListenAddress::parse(s)
    }
}
