use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::responses::TokenResponse;

/// Scopes needed for catalog read/delete plus offline refresh.
pub const SCOPE: &str = "openid AdobeID lr_partner_apis offline_access lr_partner_rendition_apis";

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Random bytes behind the PKCE verifier; encodes to 128 characters.
const VERIFIER_BYTES: usize = 96;

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl OAuthSettings {
    /// Public clients have no secret and authenticate with PKCE.
    pub fn uses_pkce(&self) -> bool {
        self.client_secret.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge for a verifier.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Pull the authorization code out of whatever the user pasted: either the
/// bare code or the full redirect URL.
pub fn extract_code(input: &str, expected_state: Option<&str>) -> Result<String, AuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::MissingCode);
    }
    if !input.contains("code=") && !input.contains("error=") {
        return Ok(input.to_string());
    }

    let query = input.split_once('?').map_or(input, |(_, q)| q);
    let mut code = None;
    let mut state = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(AuthError::Denied(value.into_owned())),
            _ => {}
        }
    }
    if let (Some(expected), Some(got)) = (expected_state, state.as_deref()) {
        if expected != got {
            return Err(AuthError::StateMismatch);
        }
    }
    code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)
}

pub struct OAuthClient {
    http: Client,
    settings: OAuthSettings,
    endpoints: Endpoints,
}

impl OAuthClient {
    pub fn new(settings: OAuthSettings) -> Result<Self, AuthError> {
        let endpoints = Endpoints::for_client(settings.client_secret.is_some());
        Self::with_endpoints(settings, endpoints)
    }

    pub fn with_endpoints(
        settings: OAuthSettings,
        endpoints: Endpoints,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            settings,
            endpoints,
        })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    pub fn authorization_url(
        &self,
        state: &str,
        pkce: Option<&PkcePair>,
    ) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", &self.settings.redirect_uri)
                .append_pair("scope", SCOPE)
                .append_pair("response_type", "code")
                .append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }
        Ok(url)
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.settings.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.as_str()));
        } else if let Some(verifier) = verifier {
            form.push(("code_verifier", verifier));
        }
        self.post_token(&form).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.settings.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        self.post_token(&form).await
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        tracing::debug!("POST {}", self.endpoints.token);
        let response = self
            .http
            .post(&self.endpoints.token)
            .form(form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            if text.contains("invalid_client") {
                tracing::warn!(
                    "invalid_client: check the client ID and that the integration is configured as a public client for PKCE"
                );
            } else if text.contains("invalid_grant") {
                tracing::warn!(
                    "invalid_grant: the code may be used or expired, or the redirect URI does not match"
                );
            }
            return Err(AuthError::TokenEndpoint {
                code: status.as_u16(),
                message: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}
