/// Canonicalizes a url fragment: leading `/` enforced, trailing `/` stripped.
///
/// An empty fragment stays empty so that an absent prefix composes cleanly.
/// A run of trailing slashes is stripped as a whole so the result is a fixed point.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut url = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// `prefix + url`, both normalized. This is the pattern a route is registered under.
pub fn compose_prefixed_url(prefix: &str, url: &str) -> String {
    format!("{}{}", normalize(prefix), normalize(url))
}

/// Absolute form of a mock url, used when logging requests.
pub fn compose_full_url(host: &str, port: u16, prefix: &str, url: &str) -> String {
    format!("http://{}:{}{}", host, port, compose_prefixed_url(prefix, url))
}

/// Normalizes an inbound request target before it is matched against routes.
///
/// Drops the query string, empty and `.` segments; `..` pops the previous segment.
pub fn normalize_request_path(target: &str) -> String {
    let path = target.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
