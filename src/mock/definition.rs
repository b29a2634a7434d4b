use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::url::normalize;

pub const DEFINITION_EXTENSION: &str = "json";
pub const DEFAULT_HTTP_CODE: u16 = 200;
pub const DEFAULT_HTTP_METHOD: &str = "GET";

/// Why a definition file produced no mock.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("definition file '{file}' not found")]
    NotFound { file: String },
    #[error("failed to read definition file '{file}': {source}")]
    Read {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse definition file '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("definition file '{file}' is empty or not a json object")]
    NotAnObject { file: String },
    #[error("definition file '{file}' is missing a non-empty string 'url'")]
    MissingUrl { file: String },
    #[error("definition file '{file}' is missing 'response'")]
    MissingResponse { file: String },
}

/// Definition file as written on disk. Every field is optional here; the
/// type checks happen in [`MockDefinition::from_raw`] so that a wrong type
/// degrades to a default instead of failing deserialization.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RawDefinition {
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub http_code: Option<Value>,
    #[serde(default)]
    pub http_method: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub headers: Option<Value>,
}

/// A validated definition. `url` is always normalized and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MockDefinition {
    pub url: String,
    pub http_code: u16,
    pub http_method: String,
    pub response: Value,
    pub headers: Vec<(String, String)>,
    pub source_path: PathBuf,
}

impl MockDefinition {
    pub fn from_raw(raw: RawDefinition, source_path: &Path) -> Result<Self, DefinitionError> {
        let file = file_key(source_path).unwrap_or_else(|| source_path.display().to_string());

        let url = match raw.url {
            Some(Value::String(url)) => normalize(&url),
            _ => String::new(),
        };
        if url.is_empty() {
            return Err(DefinitionError::MissingUrl { file });
        }

        let response = raw
            .response
            .ok_or_else(|| DefinitionError::MissingResponse { file: file.clone() })?;

        let http_code = match raw.http_code.as_ref().and_then(as_status_code) {
            Some(code) => code,
            None => {
                warn!(%file, "Definition is missing a valid 'http_code', using '{}'", DEFAULT_HTTP_CODE);
                DEFAULT_HTTP_CODE
            }
        };

        let http_method = match raw.http_method {
            Some(Value::String(method)) => method,
            _ => {
                warn!(%file, "Definition is missing a valid 'http_method', using '{}'", DEFAULT_HTTP_METHOD);
                DEFAULT_HTTP_METHOD.to_string()
            }
        };

        let headers = match raw.headers {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(value) => Some((name, value)),
                    other => {
                        debug!(%file, header = %name, value = %other, "Ignoring non-string header value");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(MockDefinition {
            url,
            http_code,
            http_method,
            response,
            headers,
            source_path: source_path.to_path_buf(),
        })
    }

    /// Base name of the originating file; the identity key in the route table.
    pub fn file_name(&self) -> String {
        file_key(&self.source_path).unwrap_or_default()
    }
}

fn as_status_code(value: &Value) -> Option<u16> {
    value
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .filter(|code| (100..=999).contains(code))
}

/// Parses the content of one definition file.
pub fn parse_definition(content: &str, source_path: &Path) -> Result<MockDefinition, DefinitionError> {
    let file = file_key(source_path).unwrap_or_else(|| source_path.display().to_string());
    let value: Value = serde_json::from_str(content).map_err(|source| DefinitionError::Parse {
        file: file.clone(),
        source,
    })?;
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(DefinitionError::NotAnObject { file }),
    }
    let raw: RawDefinition =
        serde_json::from_value(value).map_err(|source| DefinitionError::Parse { file, source })?;
    MockDefinition::from_raw(raw, source_path)
}

/// Reads and parses a definition file from disk.
pub fn load_definition(path: &Path) -> Result<MockDefinition, DefinitionError> {
    let file = file_key(path).unwrap_or_else(|| path.display().to_string());
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            DefinitionError::NotFound { file }
        } else {
            DefinitionError::Read { file, source: e }
        }
    })?;
    parse_definition(&content, path)
}

/// Whether `path` carries the definition file extension.
pub fn is_definition_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(DEFINITION_EXTENSION)
}

pub fn file_key(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// The structure logged at startup and printed by `--print-example`.
pub fn example_definition() -> Value {
    json!({
        "headers": { "X-Mock": "true" },
        "url": "/example/url/.*/using/regex",
        "http_code": 200,
        "http_method": "GET",
        "response": {
            "key1": "value1",
            "key2": "value2",
            "key3": ["value3", "value4"]
        }
    })
}
