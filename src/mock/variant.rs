use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::warn;

use super::definition::MockDefinition;
use crate::http::method::HttpMethod;

/// Renderable form of a definition's `response` payload.
///
/// This set is closed: rendering matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// File name resolved against the watched directory on every request.
    File(String),
    Empty,
}

impl MockResponse {
    /// First match wins: object, array, string file name, anything else empty.
    pub fn resolve(response: Value) -> Self {
        match response {
            Value::Object(map) => MockResponse::Object(map),
            Value::Array(items) => MockResponse::Array(items),
            Value::String(file_name) => MockResponse::File(file_name),
            _ => MockResponse::Empty,
        }
    }
}

/// A compiled mock: the common definition fields plus its response variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Mock {
    pub url: String,
    pub http_code: u16,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub source_path: PathBuf,
    pub response: MockResponse,
}

impl Mock {
    pub fn new(definition: MockDefinition, method: HttpMethod) -> Self {
        let response = MockResponse::resolve(definition.response);
        if response == MockResponse::Empty {
            warn!(
                file = %definition.source_path.display(),
                "Response is not a json object, json array or file name, using empty response"
            );
        }
        Mock {
            url: definition.url,
            http_code: definition.http_code,
            method,
            headers: definition.headers,
            source_path: definition.source_path,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_order() {
        assert!(matches!(MockResponse::resolve(json!({"a": 1})), MockResponse::Object(_)));
        assert!(matches!(MockResponse::resolve(json!([1, 2])), MockResponse::Array(_)));
        assert_eq!(
            MockResponse::resolve(json!("payload.txt")),
            MockResponse::File("payload.txt".to_string())
        );
        assert_eq!(MockResponse::resolve(json!(42)), MockResponse::Empty);
        assert_eq!(MockResponse::resolve(json!(true)), MockResponse::Empty);
    }

    #[test]
    fn test_mock_keeps_definition_fields() {
        let definition = MockDefinition {
            url: "/list".to_string(),
            http_code: 201,
            http_method: "get".to_string(),
            response: json!([1, 2, 3]),
            headers: vec![("X-A".to_string(), "b".to_string())],
            source_path: PathBuf::from("/mocks/list.json"),
        };
        let mock = Mock::new(definition, HttpMethod::Get);
        assert_eq!(mock.url, "/list");
        assert_eq!(mock.http_code, 201);
        assert_eq!(mock.response, MockResponse::Array(vec![json!(1), json!(2), json!(3)]));
        assert_eq!(mock.headers.len(), 1);
    }
}
