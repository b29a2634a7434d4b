use std::collections::HashMap;
use tracing::debug;

use crate::mock::url::normalize_request_path;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Request target exactly as received, query string included.
    pub target: String,
    /// Normalized path used for route matching.
    pub path: String,
    pub query_params: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            path: normalize_request_path(target),
            query_params: parse_query(target),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

fn parse_query(target: &str) -> Vec<(String, String)> {
    let Some((_, query)) = target.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or("").to_string();
            let value = kv.next().unwrap_or("").to_string();
            (key, value)
        })
        .collect()
}

/// Parses a raw HTTP/1.x request. Returns `None` when there is no usable request line.
pub fn parse_http_request(buffer: &[u8]) -> Option<Request> {
    let header_end = buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .unwrap_or(buffer.len());
    let headers_part = String::from_utf8_lossy(&buffer[..header_end]);

    // The first line is the request line, e.g. "GET /path?query=val HTTP/1.1".
    let mut lines = headers_part.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;

    let mut request = Request::new(method, target);
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            request
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    if header_end + 4 <= buffer.len() {
        request.body = buffer[header_end + 4..].to_vec();
    }

    debug!("Method: {}", request.method);
    debug!("Path: {}", request.path);
    Some(request)
}
