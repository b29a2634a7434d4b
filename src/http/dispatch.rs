use std::{path::Path, sync::Arc};

use tracing::{debug, error, info, warn};

use super::{
    method::HttpMethod,
    request::Request,
    response::{Response, APPLICATION_JSON, CONTENT_TYPE},
    router::RouteTable,
};
use crate::mock::{
    url::compose_full_url,
    variant::{Mock, MockResponse},
};

/// Matches requests against the route table and renders the matched mock.
///
/// Matching itself is delegated to [`RoutesData::find`](super::router::RoutesData::find):
/// the first registered route whose method and pattern fit the path answers.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    host: String,
    port: u16,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>, host: &str, port: u16) -> Self {
        Dispatcher {
            table,
            host: host.to_string(),
            port,
        }
    }

    pub async fn dispatch(&self, request: &Request) -> Response {
        let route = HttpMethod::from_wire(&request.method)
            .and_then(|method| self.table.snapshot().find(method, &request.path));

        let Some(route) = route else {
            warn!(method = %request.method, url = %request.target, "Received request on unknown url");
            return Response::not_found();
        };

        info!(
            url = %compose_full_url(&self.host, self.port, self.table.prefix(), &route.mock.url),
            file = %route.mock.source_path.display(),
            "Received request"
        );
        log_request(request);

        let response = render(&route.mock, self.table.root()).await;
        info!(status = response.status, "Response http code");
        for (name, value) in &response.headers {
            debug!("Response header: {}: {}", name, value);
        }
        response
    }
}

fn log_request(request: &Request) {
    for (name, value) in &request.headers {
        debug!("Request header: {}: {}", name, value);
    }
    for (name, value) in &request.query_params {
        debug!("Request param: {}: {}", name, value);
    }
    let body = match serde_json::from_slice::<serde_json::Value>(&request.body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_default(),
        Err(_) => request.body_text(),
    };
    debug!("Request body: {}", if body.is_empty() { "#empty#" } else { body.as_str() });
}

/// Builds the response for `mock`. File-backed bodies are read from `root` now,
/// so edits to those files show up without a reload.
pub async fn render(mock: &Mock, root: &Path) -> Response {
    let mut response = Response::new(mock.http_code);
    if matches!(mock.response, MockResponse::Object(_) | MockResponse::Array(_)) {
        response.set_header(CONTENT_TYPE, APPLICATION_JSON);
    }
    for (name, value) in &mock.headers {
        response.set_header(name, value);
    }

    response.body = match &mock.response {
        MockResponse::Object(map) => pretty_json(map),
        MockResponse::Array(items) => pretty_json(items),
        MockResponse::File(file_name) => {
            let path = root.join(file_name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    debug!(file = %path.display(), bytes = bytes.len(), "Response body read from file");
                    bytes
                }
                Err(err) => {
                    error!(file = %file_name, error = %err, "File is missing, using empty response");
                    Vec::new()
                }
            }
        }
        MockResponse::Empty => {
            info!("Response is empty, no json object, json array or file configured");
            Vec::new()
        }
    };
    response
}

fn pretty_json<T: serde::Serialize>(payload: &T) -> Vec<u8> {
    match serde_json::to_string_pretty(payload) {
        Ok(body) => body.into_bytes(),
        Err(err) => {
            error!(error = %err, "Failed to serialize json response");
            Vec::new()
        }
    }
}
