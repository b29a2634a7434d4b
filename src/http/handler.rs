use std::sync::Arc;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

use super::dispatch::Dispatcher;
use super::request::parse_http_request;
use super::response::Response;

/// Request line plus headers, terminator included.
pub const MAX_HEADER_BYTES: usize = 16 * 1024;
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// What reading a request produced: the raw bytes, or the response that
/// refuses it. Reading stops as soon as a limit is crossed.
#[derive(Debug)]
pub enum ReadOutcome {
    Complete(Vec<u8>),
    Rejected(Response),
}

fn header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|window| window == b"\r\n\r\n")
}

pub async fn read_http_request<R: AsyncRead + Unpin>(stream: &mut R) -> io::Result<ReadOutcome> {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];

    // Read until we find the header terminator.
    let header_end = loop {
        if let Some(end) = header_end(&data) {
            break end;
        }
        if data.len() > MAX_HEADER_BYTES {
            warn!(limit = MAX_HEADER_BYTES, "Request header too large");
            return Ok(ReadOutcome::Rejected(Response::new(431)));
        }
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(ReadOutcome::Complete(data));
        }
        data.extend_from_slice(&buf[..n]);
    };
    if header_end + 4 > MAX_HEADER_BYTES {
        warn!(limit = MAX_HEADER_BYTES, "Request header too large");
        return Ok(ReadOutcome::Rejected(Response::new(431)));
    }

    let headers_section = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut content_length = 0;
    // Skip the request line.
    for line in headers_section.lines().skip(1) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("Content-Length") {
                match value.trim().parse::<usize>() {
                    Ok(length) => content_length = length,
                    Err(_) => {
                        warn!(value = %value.trim(), "Invalid Content-Length");
                        return Ok(ReadOutcome::Rejected(Response::bad_request()));
                    }
                }
            }
        }
    }
    if content_length > MAX_BODY_BYTES {
        warn!(content_length, limit = MAX_BODY_BYTES, "Request body too large");
        return Ok(ReadOutcome::Rejected(Response::new(413)));
    }

    let body_start = header_end + 4;
    let current_body_len = data.len().saturating_sub(body_start);
    if current_body_len < content_length {
        let mut body_buf = vec![0; content_length - current_body_len];
        stream.read_exact(&mut body_buf).await?;
        data.extend(body_buf);
    }
    Ok(ReadOutcome::Complete(data))
}

/// Serves one request on `stream` and closes it.
pub async fn handle_client(
    mut stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bytes = match read_http_request(&mut stream).await? {
        ReadOutcome::Complete(data) if data.is_empty() => return Ok(()),
        ReadOutcome::Complete(data) => match parse_http_request(&data) {
            Some(request) => {
                let response = dispatcher.dispatch(&request).await;
                // HEAD gets the headers and Content-Length of the full response.
                response.to_bytes(request.method != "HEAD")
            }
            None => {
                warn!("Received malformed request");
                Response::bad_request().to_bytes(true)
            }
        },
        ReadOutcome::Rejected(response) => response.to_bytes(true),
    };

    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}
