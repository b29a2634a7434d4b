use serde_json::{json, Value};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Pretty-printed json body with a json content type.
    pub fn json(status: u16, value: &Value) -> Self {
        let mut response = Response::new(status);
        response.set_header(CONTENT_TYPE, APPLICATION_JSON);
        response.body = serde_json::to_string_pretty(value)
            .unwrap_or_default()
            .into_bytes();
        response
    }

    pub fn not_found() -> Self {
        Response::json(404, &json!({ "404": "Response not found." }))
    }

    pub fn bad_request() -> Self {
        Response::new(400)
    }

    /// Sets `name`, replacing any header with the same name regardless of case.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serializes status line, headers and body. The connection is always closed after.
    ///
    /// Without `include_body` (answers to HEAD) the body is left out but
    /// `Content-Length` still announces its size.
    pub fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        if include_body {
            bytes.extend_from_slice(&self.body);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_body() {
        let response = Response::not_found();
        assert_eq!(response.status, 404);
        assert_eq!(response.header("content-type"), Some(APPLICATION_JSON));
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({"404": "Response not found."}));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut response = Response::new(200);
        response.set_header("Content-Type", APPLICATION_JSON);
        response.set_header("content-type", "text/plain");
        assert_eq!(response.headers, vec![("content-type".to_string(), "text/plain".to_string())]);
    }

    #[test]
    fn test_to_bytes() {
        let mut response = Response::new(201);
        response.set_header("X-Mock", "yes");
        response.set_header("Content-Length", "999");
        response.body = b"hi".to_vec();
        let text = String::from_utf8(response.to_bytes(true)).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 201 Created\r\nX-Mock: yes\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi"
        );
    }

    #[test]
    fn test_to_bytes_without_body_keeps_length() {
        let mut response = Response::new(200);
        response.body = b"hello".to_vec();
        let text = String::from_utf8(response.to_bytes(false)).unwrap();
        assert_eq!(text, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\n");
    }
}
