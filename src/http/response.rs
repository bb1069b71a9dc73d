use std::collections::BTreeMap;

/// HTTP status codes produced by the server.
///
/// The named variants cover every status the relay emits itself. Upstream
/// 2xx statuses without a named variant are carried through `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 413 Content Too Large
    ContentTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
    /// Any other numeric status
    Other(u16),
}

impl StatusCode {
    /// Maps a numeric status onto a variant.
    ///
    /// # Example
    ///
    /// ```
    /// # use harmonia_relay::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(204), StatusCode::NoContent);
    /// assert_eq!(StatusCode::from_u16(203), StatusCode::Other(203));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            405 => StatusCode::MethodNotAllowed,
            413 => StatusCode::ContentTooLarge,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use harmonia_relay::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::ContentTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// `Other` has no phrase; the status line then ends after the code,
    /// which HTTP/1.1 permits.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::ContentTooLarge => "Content Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::Other(_) => "",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// Headers are kept in a sorted map so that equal responses serialize to
/// equal bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: BTreeMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds every header from an iterator of pairs.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in headers {
            self.headers.insert(key.into(), value.into());
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Automatically adds the Content-Length header based on body size if not already present.
    /// A 204 never carries Content-Length.
    pub fn build(mut self) -> Response {
        if self.status == StatusCode::NoContent {
            self.headers.remove("Content-Length");
        } else {
            self.headers
                .entry("Content-Length".to_string())
                .or_insert_with(|| self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a 400 Bad Request response for malformed HTTP framing.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Content-Type", "text/plain")
            .header("Connection", "close")
            .body(b"400 Bad Request".to_vec())
            .build()
    }

    /// Creates a 413 response for a declared body over the parser's limit.
    pub fn content_too_large() -> Self {
        ResponseBuilder::new(StatusCode::ContentTooLarge)
            .header("Content-Type", "text/plain")
            .header("Connection", "close")
            .body(b"413 Content Too Large".to_vec())
            .build()
    }

    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
