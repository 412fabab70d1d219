//! HTTP cache control module
//!
//! Provides HTTP date handling and `If-Modified-Since` evaluation.

use chrono::{DateTime, Duration, Utc};
use std::time::SystemTime;

/// Lifetime granted to static assets: 60 days
pub const STATIC_MAX_AGE_SECS: u32 = 5_184_000;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// No store
    NoStore,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoStore => "no-store".to_string(),
        }
    }

    /// `Expires` value matching this policy, relative to `now`
    pub fn expires_at(self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Self::Public(max_age) => Some(format_http_date(
                now + Duration::seconds(i64::from(max_age)),
            )),
            Self::NoStore => None,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Public(STATIC_MAX_AGE_SECS)
    }
}

/// Format a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date
///
/// Accepts the three forms recipients must handle (IMF-fixdate, RFC 850 and
/// asctime) and, leniently, RFC 3339.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    match httpdate::parse_http_date(value) {
        Ok(time) => Some(time.into()),
        Err(_) => DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .ok(),
    }
}

/// Truncate a filesystem timestamp to whole seconds, the precision of HTTP dates
pub fn to_http_precision(time: SystemTime) -> DateTime<Utc> {
    let time: DateTime<Utc> = time.into();
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

/// Check whether a resource modified at `mtime` is fresh for the client
///
/// # Arguments
/// * `mtime` - Resource modification time
/// * `if_modified_since` - Client-sent If-Modified-Since header
///
/// # Returns
/// Returns true if the client copy is current (should return 304); an
/// unparsable header counts as absent
pub fn is_not_modified(mtime: SystemTime, if_modified_since: Option<&str>) -> bool {
    if_modified_since
        .and_then(parse_http_date)
        .is_some_and(|since| to_http_precision(mtime) <= since)
}
