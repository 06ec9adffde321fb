//! Adobe IMS OAuth: interactive login, token persistence and refresh.
//!
//! Login is the authorization-code flow. Public clients (no secret) add a
//! PKCE challenge; the user pastes the code or the whole redirect URL back
//! into the terminal.

pub mod endpoints;
pub mod error;
pub mod oauth;
pub mod responses;
pub mod tokens;

use std::io::{self, Write};

use uuid::Uuid;

pub use self::error::AuthError;
pub use self::oauth::{OAuthClient, OAuthSettings, PkcePair, DEFAULT_REDIRECT_URI};
pub use self::responses::StoredTokens;
pub use self::tokens::{TokenManager, TokenStatus};

/// Ask the user for the authorization code, re-prompting on empty input.
async fn prompt_for_code() -> Result<String, AuthError> {
    let input = tokio::task::spawn_blocking(|| -> io::Result<String> {
        loop {
            print!("\nPaste the authorization code (or the full URL): ");
            io::stdout().flush()?;
            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                return Ok(String::new());
            }
            if !line.trim().is_empty() {
                return Ok(line);
            }
            println!("Please enter the authorization code or URL.");
        }
    })
    .await
    .map_err(io::Error::other)??;
    Ok(input)
}

/// Run the interactive login and persist the resulting tokens.
pub async fn login(manager: &TokenManager) -> Result<StoredTokens, AuthError> {
    let oauth = manager.oauth();
    let state = Uuid::new_v4().simple().to_string();
    let pkce = oauth.settings().uses_pkce().then(PkcePair::generate);
    let url = oauth.authorization_url(&state, pkce.as_ref())?;

    println!("Open this URL in your browser and authorize access:\n");
    println!("{url}\n");
    println!("After authorizing you will be redirected to a page that may not load.");
    println!(
        "Copy the code from its URL, e.g. {}?code=AUTHORIZATION_CODE",
        oauth.settings().redirect_uri
    );

    let input = prompt_for_code().await?;
    let code = oauth::extract_code(&input, Some(&state))?;
    tracing::debug!("Exchanging authorization code for tokens");

    let resp = oauth
        .exchange_code(&code, pkce.as_ref().map(|p| p.verifier.as_str()))
        .await?;
    let tokens = manager.store_response(resp, None).await?;
    tracing::info!("Authentication completed successfully");
    Ok(tokens)
}
