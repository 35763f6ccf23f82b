/// Status codes the proxy produces on its own.
///
/// Everything else the client sees comes verbatim from the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 404 Not Found - no route for the requested host
    NotFound,
    /// 502 Bad Gateway - the upstream could not be reached
    BadGateway,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use hostgate::http::response::StatusCode;
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// assert_eq!(StatusCode::BadGateway.as_u16(), 502);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::NotFound => 404,
            StatusCode::BadGateway => 502,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::NotFound => "Not Found",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }
}

/// A response synthesized by the proxy.
///
/// Headers keep insertion order so the bytes on the wire are predictable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// A bodiless response carrying only `Content-Length: 0`.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![("Content-Length".to_string(), "0".to_string())],
            body: Vec::new(),
        }
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::empty(StatusCode::NotFound)
    }

    /// Creates a 502 Bad Gateway response.
    pub fn bad_gateway() -> Self {
        Self::empty(StatusCode::BadGateway)
    }
}
