use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated. Run `lightroom-rs auth login` first.")]
    NotAuthenticated,

    #[error("No client ID configured; set ADOBE_CLIENT_ID or pass --client-id")]
    MissingClientId,

    #[error("No authorization code found in input")]
    MissingCode,

    #[error("OAuth state mismatch; the pasted URL belongs to a different login attempt")]
    StateMismatch,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("Token endpoint error (HTTP {code}): {message}")]
    TokenEndpoint { code: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}
