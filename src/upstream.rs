use thiserror::Error;

use crate::headers::Headers;
use crate::response::CacheableResponse;

/// Value of the synthesized `Server` header on every proxied response.
pub const SERVER_NAME: &str = "Ian's Proxy";

// Upstream headers copied through to the client and into the cache. The
// rest, hop-by-hop or otherwise, is dropped.
const COPIED_HEADERS: [&str; 5] =
    ["Content-Type", "Cache-Control", "Date", "Expires", "Set-Cookie"];

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("malformed request URL: {0}")]
    BadUrl(reqwest::Error),
    #[error("upstream request failed: {0}")]
    Request(reqwest::Error),
}

/// Performs the upstream GET and projects the result: filtered headers, a
/// synthesized `Server`, and the body buffered in full so the client write
/// and the background cache write each get their own copy of the stream.
pub async fn fetch(request_url: &str) -> Result<CacheableResponse, UpstreamError> {
    let upstream = reqwest::get(request_url).await.map_err(classify)?;
    let proto = proto_string(upstream.version());
    let status_code = upstream.status().as_u16();
    let headers = filtered_headers(upstream.headers());
    let body = upstream.bytes().await.map_err(classify)?.to_vec();
    Ok(CacheableResponse { proto, status_code, headers, body })
}

fn classify(cause: reqwest::Error) -> UpstreamError {
    if cause.is_builder() {
        UpstreamError::BadUrl(cause)
    } else {
        UpstreamError::Request(cause)
    }
}

fn filtered_headers(upstream_headers: &http::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for name in COPIED_HEADERS {
        for value in upstream_headers.get_all(name) {
            headers.append(name, String::from_utf8_lossy(value.as_bytes()));
        }
    }
    headers.set("Server", SERVER_NAME);
    headers
}

fn proto_string(version: http::Version) -> String {
    if version == http::Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == http::Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == http::Version::HTTP_3 {
        "HTTP/3.0"
    } else if version == http::Version::HTTP_09 {
        "HTTP/0.9"
    } else {
        "HTTP/1.1"
    }
    .to_owned()
}
