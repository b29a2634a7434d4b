use std::{fmt, str::FromStr};

use thiserror::Error;

/// The HTTP verbs a mock can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Options,
    Get,
    Head,
    Post,
    Put,
    Delete,
    Trace,
    Connect,
    Patch,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown http method '{0}'")]
pub struct MethodError(pub String);

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Exact, case-sensitive match as methods appear on a request line.
    pub fn from_wire(token: &str) -> Option<Self> {
        match token {
            "OPTIONS" => Some(HttpMethod::Options),
            "GET" => Some(HttpMethod::Get),
            "HEAD" => Some(HttpMethod::Head),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "TRACE" => Some(HttpMethod::Trace),
            "CONNECT" => Some(HttpMethod::Connect),
            "PATCH" => Some(HttpMethod::Patch),
            _ => None,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = MethodError;

    /// Case-insensitive, for the `http_method` field of definitions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::from_wire(&s.trim().to_ascii_uppercase()).ok_or_else(|| MethodError(s.to_string()))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
