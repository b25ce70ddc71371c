use tokio::fs::File;
use tokio::io::BufReader;

use crate::headers::Headers;

/// Upstream response projected to what the proxy serves and caches: the
/// protocol string, the status code, the filtered header set and the body,
/// fully buffered so the client write and the cache write cannot block each
/// other.
#[derive(Clone, Debug)]
pub struct CacheableResponse {
    pub proto: String,
    pub status_code: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Response rebuilt from an on-disk entry. The body is the not-yet-consumed
/// tail of the entry stream and owns the underlying source; dropping it
/// closes the file.
pub struct CachedResponse<R = File> {
    pub status_code: u16,
    pub headers: Headers,
    pub body: BufReader<R>,
}

/// Canonical IANA reason phrase for `status_code`, or the empty string when
/// the code is unknown.
pub fn reason_phrase(status_code: u16) -> &'static str {
    http::StatusCode::from_u16(status_code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}
