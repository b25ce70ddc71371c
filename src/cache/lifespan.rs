use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::timestamp;
use crate::headers::Headers;

static UNCACHEABLE_DIRECTIVES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)private|no-cache|no-store").unwrap());

static MAX_AGE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)max-age=(\d+)").unwrap());

/// How long a response with `headers` may be served from the cache.
/// `Duration::ZERO` means "do not cache".
///
/// `Set-Cookie` and the `private` / `no-cache` / `no-store` directives veto
/// caching outright. Otherwise the first positive `max-age` wins, then the
/// first `Expires` value that lies in the future. Directive matching is a
/// case-insensitive substring search, so an unknown token that merely
/// contains `no-cache` also disables caching.
pub fn cache_lifespan(headers: &Headers) -> Duration {
    if headers.contains("Set-Cookie") || cache_control_prevents_caching(headers) {
        return Duration::ZERO;
    }
    let from_max_age = max_age_lifespan(headers);
    if !from_max_age.is_zero() {
        return from_max_age;
    }
    expires_lifespan(headers)
}

fn cache_control_prevents_caching(headers: &Headers) -> bool {
    headers
        .get("Cache-Control")
        .into_iter()
        .flatten()
        .any(|value| UNCACHEABLE_DIRECTIVES.is_match(value))
}

fn max_age_lifespan(headers: &Headers) -> Duration {
    for value in headers.get("Cache-Control").into_iter().flatten() {
        let Some(directive) = MAX_AGE_DIRECTIVE.captures(value) else {
            continue;
        };
        let seconds: u64 = directive[1].parse().unwrap_or(0);
        // max-age=0 does not end the scan; a later value may still carry a
        // positive max-age, and Expires remains a fallback.
        if seconds > 0 {
            return Duration::from_secs(seconds);
        }
    }
    Duration::ZERO
}

fn expires_lifespan(headers: &Headers) -> Duration {
    for value in headers.get("Expires").into_iter().flatten() {
        let until = timestamp::duration_until(value);
        if until > 0 {
            return Duration::from_secs(until as u64);
        }
    }
    Duration::ZERO
}
