use std::time::SystemTime;

// HTTP timestamps come in the three layouts of RFC 7231, section 7.1.1.1:
// RFC 1123, RFC 850 and ANSI C asctime. `httpdate` recognizes exactly those.
// https://datatracker.ietf.org/doc/html/rfc7231#section-7.1.1.1

/// Signed whole seconds from now until `timestamp`; negative when the
/// instant is in the past, `0` when the value is not an HTTP date.
pub fn duration_until(timestamp: &str) -> i64 {
    match httpdate::parse_http_date(timestamp) {
        Ok(instant) => signed_delta(SystemTime::now(), instant),
        Err(_) => 0,
    }
}

/// Signed whole seconds from `timestamp` until now; negative when the
/// instant is in the future, `0` when the value is not an HTTP date.
pub fn duration_since(timestamp: &str) -> i64 {
    match httpdate::parse_http_date(timestamp) {
        Ok(instant) => signed_delta(instant, SystemTime::now()),
        Err(_) => 0,
    }
}

fn signed_delta(from: SystemTime, to: SystemTime) -> i64 {
    match to.duration_since(from) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(backwards) => -(backwards.duration().as_secs() as i64),
    }
}
