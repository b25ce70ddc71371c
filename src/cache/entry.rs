//! On-disk entry codec.
//!
//! An entry is a byte-exact textual record:
//!
//! ```text
//! <proto> SP <status code> SP <reason> CRLF
//! <header-name> ": " <header-value> CRLF      (one line per value, any order)
//! "X-Cache: HIT" CRLF
//! CRLF
//! <body bytes, verbatim>
//! ```

use std::io;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use super::timestamp;
use crate::headers::Headers;
use crate::response::{reason_phrase, CacheableResponse, CachedResponse};

const CRLF: &str = "\r\n";

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("unexpected end of cache entry")]
    UnexpectedEof,
    #[error("first line of the cache entry does not contain a valid HTTP response status code")]
    MalformedStatusLine,
    #[error("malformed header in cache entry")]
    MalformedHeader,
    #[error("Date header missing from cache entry")]
    MissingDate,
    #[error("multiple Date headers in cache entry")]
    MultipleDates,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Serializes a [`CacheableResponse`] into the entry format through a
/// buffered sink. Any write error is fatal for the entry; the caller must
/// discard the partially written file.
pub struct EntryWriter<W: AsyncWrite + Unpin> {
    sink: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> EntryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink: BufWriter::new(sink) }
    }

    /// Writes the whole entry. The sink is flushed exactly once, at the end.
    pub async fn write_entry(&mut self, response: &CacheableResponse) -> io::Result<()> {
        self.write_status_line(&response.proto, response.status_code).await?;
        self.write_header_lines(&response.headers).await?;
        self.sink.write_all(&response.body).await?;
        self.sink.flush().await
    }

    async fn write_status_line(&mut self, proto: &str, status_code: u16) -> io::Result<()> {
        let line = format!("{proto} {status_code} {}{CRLF}", reason_phrase(status_code));
        self.sink.write_all(line.as_bytes()).await
    }

    async fn write_header_lines(&mut self, headers: &Headers) -> io::Result<()> {
        for (name, values) in headers.iter() {
            for value in values {
                self.sink.write_all(format!("{name}: {value}{CRLF}").as_bytes()).await?;
            }
        }
        self.sink.write_all(format!("X-Cache: HIT{CRLF}{CRLF}").as_bytes()).await
    }
}

static STATUS_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}\b").unwrap());

static HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z0-9_-]+)\s*:\s*(.*\S)").unwrap());

/// Parses an entry back into a response.
///
/// The status line, the headers and the `Age` override are consumed eagerly;
/// the body is left in the returned reader, which owns `source`. The parsed
/// headers must carry exactly one `Date` value; `Age` is replaced with the
/// whole seconds elapsed since that instant.
pub async fn read_entry<R: AsyncRead + Unpin>(source: R) -> Result<CachedResponse<R>, EntryError> {
    let mut reader = BufReader::new(source);
    let status_line = read_line(&mut reader).await?;
    let status_code = parse_status_code(&status_line)?;
    let mut headers = parse_headers(&mut reader).await?;
    override_age_header(&mut headers)?;
    Ok(CachedResponse { status_code, headers, body: reader })
}

async fn read_line<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> Result<String, EntryError> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    if !line.ends_with(b"\n") {
        return Err(EntryError::UnexpectedEof);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn parse_status_code(status_line: &str) -> Result<u16, EntryError> {
    STATUS_CODE
        .find(status_line)
        .and_then(|code| code.as_str().parse().ok())
        .ok_or(EntryError::MalformedStatusLine)
}

async fn parse_headers<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<Headers, EntryError> {
    let mut headers = Headers::new();
    loop {
        let line = read_line(reader).await?;
        if line == CRLF {
            return Ok(headers);
        }
        let parts = HEADER_LINE.captures(&line).ok_or(EntryError::MalformedHeader)?;
        headers.append(&parts[1], &parts[2]);
    }
}

fn override_age_header(headers: &mut Headers) -> Result<(), EntryError> {
    let age_seconds = {
        let dates = headers.get("Date").ok_or(EntryError::MissingDate)?;
        if dates.len() > 1 {
            return Err(EntryError::MultipleDates);
        }
        timestamp::duration_since(&dates[0])
    };
    headers.set("Age", age_seconds.to_string());
    Ok(())
}
