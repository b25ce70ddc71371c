use std::time::{Duration, SystemTime};

use hoard::cache::lifespan::cache_lifespan;
use hoard::headers::Headers;

fn headers(pairs: &[(&str, &str)]) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in pairs {
        headers.append(name, *value);
    }
    headers
}

fn http_date(offset_secs: i64) -> String {
    let instant = if offset_secs >= 0 {
        SystemTime::now() + Duration::from_secs(offset_secs as u64)
    } else {
        SystemTime::now() - Duration::from_secs((-offset_secs) as u64)
    };
    httpdate::fmt_http_date(instant)
}

#[cfg(test)]
mod veto_tests {
    use super::*;

    #[test]
    fn set_cookie_prevents_caching() {
        let lifespan = cache_lifespan(&headers(&[
            ("Cache-Control", "max-age=60"),
            ("Expires", "Sun, 19 Apr 2043 12:00:01 GMT"),
            ("Set-Cookie", "x"),
        ]));
        assert_eq!(lifespan, Duration::ZERO);
    }

    #[test]
    fn no_store_prevents_caching() {
        assert_eq!(cache_lifespan(&headers(&[("Cache-Control", "no-store")])), Duration::ZERO);
    }

    #[test]
    fn no_cache_prevents_caching() {
        assert_eq!(
            cache_lifespan(&headers(&[("Cache-Control", "no-cache, max-age=300")])),
            Duration::ZERO
        );
    }

    #[test]
    fn private_prevents_caching() {
        assert_eq!(
            cache_lifespan(&headers(&[("Cache-Control", "private, max-age=300")])),
            Duration::ZERO
        );
    }

    #[test]
    fn veto_directives_match_case_insensitively() {
        for value in ["Private", "NO-CACHE", "No-Store", "PRIVATE, max-age=60"] {
            assert_eq!(
                cache_lifespan(&headers(&[("Cache-Control", value)])),
                Duration::ZERO,
                "expected veto for {:?}",
                value
            );
        }
    }

    #[test]
    fn veto_matches_inside_larger_tokens() {
        // Substring matching, not tokenization: an unknown directive that
        // merely contains a veto token still disables caching.
        assert_eq!(
            cache_lifespan(&headers(&[("Cache-Control", "no-cache-please, max-age=60")])),
            Duration::ZERO
        );
    }

    #[test]
    fn veto_in_any_of_several_values_wins() {
        let lifespan = cache_lifespan(&headers(&[
            ("Cache-Control", "max-age=60"),
            ("Cache-Control", "no-store"),
        ]));
        assert_eq!(lifespan, Duration::ZERO);
    }
}

#[cfg(test)]
mod max_age_tests {
    use super::*;

    #[test]
    fn max_age_beats_expires() {
        let lifespan = cache_lifespan(&headers(&[
            ("Cache-Control", "max-age=60"),
            ("Expires", "Sun, 19 Apr 2043 12:00:01 GMT"),
        ]));
        assert_eq!(lifespan, Duration::from_secs(60));
    }

    #[test]
    fn max_age_directive_is_case_insensitive() {
        assert_eq!(
            cache_lifespan(&headers(&[("Cache-Control", "public, Max-Age=120")])),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn max_age_zero_falls_through_to_expires() {
        let lifespan = cache_lifespan(&headers(&[
            ("Cache-Control", "max-age=0"),
            ("Expires", &http_date(3600)),
        ]));
        let seconds = lifespan.as_secs();
        assert!((3598..=3600).contains(&seconds), "unexpected lifespan: {}s", seconds);
    }

    #[test]
    fn max_age_zero_without_expires_is_uncacheable() {
        assert_eq!(cache_lifespan(&headers(&[("Cache-Control", "max-age=0")])), Duration::ZERO);
    }

    #[test]
    fn later_value_with_positive_max_age_still_wins() {
        let lifespan = cache_lifespan(&headers(&[
            ("Cache-Control", "max-age=0"),
            ("Cache-Control", "max-age=300"),
        ]));
        assert_eq!(lifespan, Duration::from_secs(300));
    }
}

#[cfg(test)]
mod expires_tests {
    use super::*;

    #[test]
    fn future_expires_yields_remaining_lifespan() {
        let lifespan = cache_lifespan(&headers(&[
            ("Content-Type", "text/html"),
            ("Expires", &http_date(600)),
        ]));
        let seconds = lifespan.as_secs();
        assert!((598..=600).contains(&seconds), "unexpected lifespan: {}s", seconds);
    }

    #[test]
    fn past_expires_is_uncacheable() {
        assert_eq!(cache_lifespan(&headers(&[("Expires", &http_date(-600))])), Duration::ZERO);
    }

    #[test]
    fn first_positive_expires_value_wins() {
        let lifespan = cache_lifespan(&headers(&[
            ("Expires", &http_date(-600)),
            ("Expires", &http_date(600)),
        ]));
        assert!(lifespan > Duration::ZERO);
    }

    #[test]
    fn unparseable_expires_is_uncacheable() {
        assert_eq!(cache_lifespan(&headers(&[("Expires", "0")])), Duration::ZERO);
        assert_eq!(
            cache_lifespan(&headers(&[("Expires", "soon, hopefully")])),
            Duration::ZERO
        );
    }

    #[test]
    fn no_caching_headers_at_all_is_uncacheable() {
        assert_eq!(cache_lifespan(&Headers::new()), Duration::ZERO);
        assert_eq!(
            cache_lifespan(&headers(&[("Content-Type", "text/html"), ("Server", "Ian's Proxy")])),
            Duration::ZERO
        );
    }
}
