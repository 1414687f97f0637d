//! Header filtering and cross-origin glue.

use axum::http::{HeaderMap, HeaderValue, header};

/// Copy the allow-listed request headers into an upstream header map.
///
/// Everything else (hop-by-hop headers, cookies, host) is dropped.
pub fn forwarded_headers(request: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT] {
        if let Some(value) = request.get(&name) {
            out.insert(name, value.clone());
        }
    }
    out
}

/// Merge the fixed cross-origin headers into a response header map.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, content-type"),
    );
}

/// Build the client response headers: the upstream headers minus
/// hop-by-hop fields, with the cross-origin set merged in.
pub fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream {
        if name == &header::CONNECTION || name == &header::TRANSFER_ENCODING {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    apply_cors(&mut out);
    out
}
