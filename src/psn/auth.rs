//! NPSSO → access code → auth tokens
//!
//! # Security
//!
//! The NPSSO credential and the resulting tokens are never logged.

use reqwest::header::{AUTHORIZATION, COOKIE, LOCATION};
use tracing::debug;
use url::Url;

use super::AuthTokens;
use super::client::HttpPsnClient;
use crate::{Error, Result};

/// OAuth client id of the PlayStation mobile app
const CLIENT_ID: &str = "09515159-7237-4370-9b40-3806e67c0891";

/// Redirect URI registered for [`CLIENT_ID`]
const REDIRECT_URI: &str = "com.scee.psxandroid.scecompcall://redirect";

/// Scopes requested at authorization
const SCOPE: &str = "psn:mobile.v2.core psn:clientapp";

/// Basic credentials of [`CLIENT_ID`] for the token endpoint
const CLIENT_BASIC_AUTH: &str =
    "Basic MDk1MTUxNTktNzIzNy00MzcwLTliNDAtMzgwNmU2N2MwODkxOnVjUGprYTV0bnRCMktxc1A=";

const INVALID_NPSSO: &str = "There was a problem retrieving your PSN access code. Is your NPSSO code valid? To get a new NPSSO code, visit https://ca.account.sony.com/api/v1/ssocookie.";

impl HttpPsnClient {
    /// Request an authorization code with the NPSSO cookie, reading it from
    /// the redirect target instead of following the redirect.
    pub(super) async fn request_access_code(&self, npsso: &str) -> Result<String> {
        let url = format!("{}/authorize", self.config.auth_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("access_type", "offline"),
                ("client_id", CLIENT_ID),
                ("redirect_uri", REDIRECT_URI),
                ("response_type", "code"),
                ("scope", SCOPE),
            ])
            .header(COOKIE, format!("npsso={npsso}"))
            .send()
            .await?;

        debug!(status = %response.status(), "Authorization response");

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::upstream(INVALID_NPSSO))?;

        access_code_from_location(location).ok_or_else(|| Error::upstream(INVALID_NPSSO))
    }

    /// Trade an authorization code for tokens.
    pub(super) async fn request_auth_tokens(&self, access_code: &str) -> Result<AuthTokens> {
        let url = format!("{}/token", self.config.auth_url);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, CLIENT_BASIC_AUTH)
            .form(&[
                ("code", access_code),
                ("redirect_uri", REDIRECT_URI),
                ("grant_type", "authorization_code"),
                ("token_format", "jwt"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error_description")
                        .or_else(|| v.get("error"))
                        .and_then(|e| e.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| format!("Token exchange failed: HTTP {status}"));
            return Err(Error::upstream(message));
        }

        let tokens: AuthTokens = serde_json::from_str(&body)
            .map_err(|e| Error::upstream(format!("Failed to parse token response: {e}")))?;

        if tokens.access_token.is_empty() {
            return Err(Error::upstream("Token response carried no access token"));
        }

        Ok(tokens)
    }
}

/// Pull the `code` query parameter out of a redirect target.
///
/// The redirect URI uses a custom scheme, so parsing goes through [`Url`]
/// which accepts any scheme.
fn access_code_from_location(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
