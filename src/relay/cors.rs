//! Cross-origin header sets.

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";

pub const ANY_ORIGIN: &str = "*";
pub const ALLOWED_METHODS: &str = "GET, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";
pub const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Headers answering an `OPTIONS` preflight.
pub fn preflight_headers() -> [(&'static str, &'static str); 4] {
    [
        (ALLOW_ORIGIN, ANY_ORIGIN),
        (ALLOW_METHODS, ALLOWED_METHODS),
        (ALLOW_HEADERS, ALLOWED_HEADERS),
        (MAX_AGE, PREFLIGHT_MAX_AGE_SECS),
    ]
}

/// Headers attached to every non-preflight response.
pub fn standard_headers() -> [(&'static str, &'static str); 2] {
    [(ALLOW_ORIGIN, ANY_ORIGIN), (ALLOW_METHODS, ALLOWED_METHODS)]
}
