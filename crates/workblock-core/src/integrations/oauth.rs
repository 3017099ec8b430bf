//! OAuth2 authorization-code flow for the calendar.
//!
//! 1. Opens the browser at the consent page
//! 2. Waits for the redirect on a localhost listener
//! 3. Exchanges the code for access + refresh tokens
//! 4. Stores the tokens in the OS keyring as JSON

use std::io::{Read, Write};
use std::net::TcpListener;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::keyring_store;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds).
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Keyring key the tokens are stored under.
    pub service_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
}

impl OAuthConfig {
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }

    pub fn auth_url_full(&self) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&scopes),
        )
    }
}

/// Run the full flow: open browser, wait for the callback, exchange the code.
pub async fn authorize(config: &OAuthConfig) -> Result<OAuthTokens, SyncError> {
    let auth_url = config.auth_url_full();
    if let Err(err) = open::that(&auth_url) {
        tracing::warn!(error = %err, "could not open browser");
    }
    eprintln!("If the browser did not open, visit:\n{auth_url}");

    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.redirect_port))?;
    let (mut stream, _) = listener.accept()?;
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf)?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let code = extract_code(&request).ok_or_else(|| SyncError::AuthenticationRequired {
        service: config.service_name.clone(),
    })?;

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body><h2>workblock is connected.</h2><p>You can close this tab.</p></body></html>";
    stream.write_all(response.as_bytes())?;
    drop(stream);
    drop(listener);

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code.as_str()),
        ("grant_type", "authorization_code"),
        ("redirect_uri", &config.redirect_uri()),
    ];
    let body = post_token_form(config, &params).await?;
    let tokens = parse_token_response(&body, None, chrono::Utc::now().timestamp())?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

/// Trade a refresh token for a new access token and store the result.
pub async fn refresh_token(config: &OAuthConfig, refresh: &str) -> Result<OAuthTokens, SyncError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];
    let body = post_token_form(config, &params).await?;
    let tokens = parse_token_response(&body, Some(refresh), chrono::Utc::now().timestamp())?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

async fn post_token_form(
    config: &OAuthConfig,
    params: &[(&str, &str)],
) -> Result<serde_json::Value, SyncError> {
    let resp = Client::new()
        .post(&config.token_url)
        .form(params)
        .send()
        .await?;
    Ok(resp.json().await?)
}

/// Turn a token endpoint response into [`OAuthTokens`].
///
/// Refresh responses usually omit the refresh token; `previous_refresh` is
/// carried over in that case.
pub fn parse_token_response(
    body: &serde_json::Value,
    previous_refresh: Option<&str>,
    now_unix: i64,
) -> Result<OAuthTokens, SyncError> {
    if let Some(error) = body.get("error") {
        return Err(SyncError::CalendarApi(format!("OAuth error: {error}")));
    }

    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| SyncError::CalendarApi("OAuth response has no access_token".into()))?
        .to_string();
    let expires_at = body
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .map(|secs| now_unix + secs);

    Ok(OAuthTokens {
        access_token,
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| previous_refresh.map(String::from)),
        expires_at,
        token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    })
}

fn store_tokens(service_name: &str, tokens: &OAuthTokens) -> Result<(), SyncError> {
    let tokens_json = serde_json::to_string(tokens)?;
    keyring_store::set(service_name, &tokens_json)
}

/// Load stored tokens from keyring.
pub fn load_tokens(service_name: &str) -> Option<OAuthTokens> {
    keyring_store::get(service_name)
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str(&json).ok())
}

/// Whether `tokens` expire within the next minute.
pub fn is_expired(tokens: &OAuthTokens, now_unix: i64) -> bool {
    match tokens.expires_at {
        Some(exp) => now_unix > exp - 60,
        None => false,
    }
}

fn extract_code(request: &str) -> Option<String> {
    let first_line = request.lines().next()?;
    let path = first_line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}
