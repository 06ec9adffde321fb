use thiserror::Error;

/// Failures talking to the Lightroom API.
///
/// Non-2xx statuses map onto a small fixed set of variants that callers
/// surface verbatim. Only connection-level failures are retried, inside the
/// client; everything else aborts the current command.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated. Run `lightroom-rs auth login` first.")]
    NotAuthenticated,

    #[error("Authentication failed (HTTP 401). Please re-authenticate.")]
    Unauthorized,

    #[error("Access forbidden (HTTP 403). Check your API permissions.")]
    Forbidden,

    #[error("API endpoint not found: {0}")]
    NotFound(String),

    #[error("API rate limit exceeded (HTTP 429). Please try again later.")]
    RateLimited,

    #[error("API request failed (HTTP {code}): {body}")]
    Status { code: u16, body: String },

    #[error("Empty response from API endpoint: {0}")]
    EmptyBody(String),

    #[error("Invalid JSON response from API: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Map a non-success status code to its taxonomy variant.
    pub fn from_status(code: u16, url: &str, body: String) -> Self {
        match code {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound(url.to_string()),
            429 => Self::RateLimited,
            _ => Self::Status { code, body },
        }
    }

    /// Whether the transport may retry the request that produced this error.
    ///
    /// Only failures that never produced an HTTP status (connect errors,
    /// timeouts) qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
