use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;

use super::error::AuthError;
use super::oauth::OAuthClient;
use super::responses::{StoredTokens, TokenResponse};

const TOKEN_FILE: &str = "tokens.json";

/// Summary of the stored credentials, for `auth status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Missing,
    Valid(StoredTokens),
    Expired { refreshable: bool },
}

/// Persists tokens in the config directory and hands out valid access
/// tokens, refreshing them when they are about to expire.
pub struct TokenManager {
    path: PathBuf,
    oauth: OAuthClient,
}

impl TokenManager {
    pub fn new(config_dir: &Path, oauth: OAuthClient) -> Self {
        Self {
            path: config_dir.join(TOKEN_FILE),
            oauth,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Load stored tokens. A corrupt file is treated as absent.
    pub async fn load(&self) -> Result<Option<StoredTokens>, AuthError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    pub async fn store(&self, tokens: &StoredTokens) -> Result<(), AuthError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(tokens)?;
        fs::write(&self.path, json).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tracing::debug!("Stored tokens in {}", self.path.display());
        Ok(())
    }

    /// Persist a fresh token response. A refresh response without a new
    /// refresh token keeps the previous one.
    pub async fn store_response(
        &self,
        resp: TokenResponse,
        previous_refresh: Option<String>,
    ) -> Result<StoredTokens, AuthError> {
        let mut tokens = StoredTokens::from_response(resp, Utc::now());
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = previous_refresh;
        }
        self.store(&tokens).await?;
        Ok(tokens)
    }

    /// Remove stored tokens. Returns whether anything was removed.
    pub async fn clear(&self) -> Result<bool, AuthError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn status(&self) -> Result<TokenStatus, AuthError> {
        Ok(match self.load().await? {
            None => TokenStatus::Missing,
            Some(t) if t.is_valid() => TokenStatus::Valid(t),
            Some(t) => TokenStatus::Expired {
                refreshable: t.refresh_token.is_some(),
            },
        })
    }

    /// Force a refresh with the stored refresh token.
    pub async fn refresh(&self) -> Result<StoredTokens, AuthError> {
        let refresh_token = self
            .load()
            .await?
            .and_then(|t| t.refresh_token)
            .ok_or(AuthError::NotAuthenticated)?;
        let resp = self.oauth.refresh(&refresh_token).await?;
        self.store_response(resp, Some(refresh_token)).await
    }

    /// A usable access token, or `None` when the user must log in again.
    ///
    /// An expired token is refreshed if possible; a failed refresh clears
    /// the stored tokens.
    pub async fn valid_access_token(&self) -> Result<Option<String>, AuthError> {
        let Some(tokens) = self.load().await? else {
            return Ok(None);
        };
        if tokens.is_valid() {
            return Ok(Some(tokens.access_token));
        }
        let Some(refresh_token) = tokens.refresh_token else {
            tracing::info!("Access token expired and no refresh token is stored");
            return Ok(None);
        };

        tracing::debug!("Access token expired, refreshing");
        match self.oauth.refresh(&refresh_token).await {
            Ok(resp) => {
                let tokens = self.store_response(resp, Some(refresh_token)).await?;
                Ok(Some(tokens.access_token))
            }
            Err(e) => {
                tracing::warn!("Failed to refresh token: {}", e);
                self.clear().await?;
                Ok(None)
            }
        }
    }
}
