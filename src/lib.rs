//! Forward HTTP caching proxy.
//!
//! A client issues `GET /?request=<url-encoded absolute URL>`; the proxy
//! fetches the target, serves it, and keeps cacheable responses on disk so
//! later requests for the same URL are answered locally with an `Age` header.

pub mod cache;
pub mod headers;
pub mod proxy;
pub mod response;
pub mod upstream;
