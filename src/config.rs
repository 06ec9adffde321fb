use std::path::PathBuf;

use crate::auth::{AuthError, OAuthSettings};
use crate::cli::GlobalArgs;

/// Application configuration, built once from CLI flags and environment.
pub struct Config {
    pub config_dir: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("config_dir", &self.config_dir)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Expand ~ to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(args: &GlobalArgs) -> Self {
        Self {
            config_dir: expand_tilde(&args.config_dir),
            client_id: non_empty(args.client_id.as_deref()),
            client_secret: non_empty(args.client_secret.as_deref()),
            redirect_uri: args.redirect_uri.clone(),
            no_progress_bar: args.no_progress_bar,
        }
    }

    /// The client ID, which doubles as the API key on every request.
    pub fn require_client_id(&self) -> Result<&str, AuthError> {
        self.client_id.as_deref().ok_or(AuthError::MissingClientId)
    }

    pub fn oauth_settings(&self) -> Result<OAuthSettings, AuthError> {
        Ok(OAuthSettings {
            client_id: self.require_client_id()?.to_string(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
        })
    }
}

/// Blank environment variables count as unset.
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
