use std::io;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use url::form_urlencoded;

use crate::cache::{key, Cache};
use crate::response::{reason_phrase, CacheableResponse, CachedResponse};
use crate::upstream::{self, UpstreamError};

const MAX_REQUEST_SIZE: usize = 8192;
const REQUEST_TIMEOUT_SECS: u64 = 30;

const METHOD_NOT_ALLOWED: &[u8] = b"HTTP/1.1 405 Method Not Allowed\r\nContent-Type: text/plain\r\nContent-Length: 31\r\nConnection: close\r\n\r\nInvalid request method; use GET";
const BAD_REQUEST_LINE: &[u8] = b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: 17\r\nConnection: close\r\n\r\nMalformed request";
const BAD_REQUEST_URL: &[u8] = b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: 21\r\nConnection: close\r\n\r\nMalformed request URL";
const UPSTREAM_FAILURE: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: 23\r\nConnection: close\r\n\r\nUpstream request failed";

/// Handles one client connection: one request, one response, close.
pub async fn handle_connection(mut stream: TcpStream, cache: Cache) {
    let handled =
        timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), handle_request(&mut stream, cache))
            .await;
    if handled.is_err() {
        debug!("proxy.handle: request timed out");
    }
    let _ = stream.shutdown().await;
}

async fn handle_request(stream: &mut TcpStream, cache: Cache) {
    let request_line = match read_request(stream).await {
        Ok(line) => line,
        Err(cause) => {
            debug!("proxy.read_request: {cause}");
            send(stream, BAD_REQUEST_LINE).await;
            return;
        }
    };
    let Some((method, target)) = parse_request_line(&request_line) else {
        send(stream, BAD_REQUEST_LINE).await;
        return;
    };
    // Request method names are case-sensitive (RFC 7230, section 3.1.1).
    if method != "GET" {
        send(stream, METHOD_NOT_ALLOWED).await;
        return;
    }

    let request_url = target_url(target);
    let cache_key = key::key(&request_url);

    if let Some(cached) = cache.retrieve(&cache_key).await {
        serve_cached(stream, cached).await;
        return;
    }

    match upstream::fetch(&request_url).await {
        Ok(response) => {
            serve_fresh(stream, &response).await;
            // Detached on purpose: the client is already served, and
            // dropping this connection must not abort the cache write.
            tokio::spawn(async move { cache.store(response, &cache_key).await });
        }
        Err(cause @ UpstreamError::BadUrl(_)) => {
            warn!("proxy.fetch: {cause}");
            send(stream, BAD_REQUEST_URL).await;
        }
        Err(cause) => {
            warn!("proxy.fetch: {cause}");
            send(stream, UPSTREAM_FAILURE).await;
        }
    }
}

/// Reads the request line and drains the request headers, which the proxy
/// ignores. Oversized requests are rejected rather than buffered.
async fn read_request(stream: &mut TcpStream) -> io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut total_size = request_line.len();
    if total_size > MAX_REQUEST_SIZE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "request line too long"));
    }
    let mut header_line = String::new();
    loop {
        header_line.clear();
        let read = reader.read_line(&mut header_line).await?;
        total_size += read;
        if read == 0 || header_line == "\r\n" || header_line == "\n" {
            return Ok(request_line);
        }
        if total_size > MAX_REQUEST_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request headers too long"));
        }
    }
}

fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return None;
    }
    Some((method, target))
}

/// The target URL travels url-encoded in the `request` query parameter.
/// Anything missing decodes to the empty string, which the upstream client
/// then rejects as a malformed URL.
fn target_url(target: &str) -> String {
    let query = target.split_once('?').map(|(_, query)| query).unwrap_or("");
    form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name.as_ref() == "request")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

async fn serve_fresh(stream: &mut TcpStream, response: &CacheableResponse) {
    let mut head = response_head(response.status_code, &response.headers);
    head.push_str("X-Cache: MISS\r\n");
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    head.push_str("Connection: close\r\n\r\n");
    let served = async {
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&response.body).await?;
        stream.flush().await
    }
    .await;
    if let Err(cause) = served {
        debug!("proxy.serve: {cause}");
    }
}

async fn serve_cached(stream: &mut TcpStream, mut cached: CachedResponse) {
    let mut head = response_head(cached.status_code, &cached.headers);
    head.push_str("Connection: close\r\n\r\n");
    let served = async {
        stream.write_all(head.as_bytes()).await?;
        tokio::io::copy(&mut cached.body, stream).await?;
        stream.flush().await
    }
    .await;
    if let Err(cause) = served {
        debug!("proxy.serve: {cause}");
    }
}

// The proxy speaks HTTP/1.1 to its own clients regardless of the upstream
// protocol; cached entries preserve the upstream proto on disk but only
// their status code survives the read path.
fn response_head(status_code: u16, headers: &crate::headers::Headers) -> String {
    let mut head = format!("HTTP/1.1 {status_code} {}\r\n", reason_phrase(status_code));
    for (name, values) in headers.iter() {
        for value in values {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
    }
    head
}

async fn send(stream: &mut TcpStream, response: &[u8]) {
    let sent = async {
        stream.write_all(response).await?;
        stream.flush().await
    }
    .await;
    if let Err(cause) = sent {
        debug!("proxy.serve: {cause}");
    }
}
