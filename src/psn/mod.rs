//! PlayStation Network upstream
//!
//! Everything the gateway needs from PSN sits behind [`PsnApi`]: the two
//! credential exchange steps and one method per data operation. The
//! production implementation is [`HttpPsnClient`]; tests substitute a stub.
//!
//! Data operations return the upstream JSON untouched. The gateway never
//! interprets result shapes.

mod auth;
mod client;
pub mod query;
pub mod region;

pub use client::HttpPsnClient;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Authorization context obtained from the second exchange step.
///
/// Lives for a single inbound request and is never persisted.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthTokens {
    /// Bearer token for data operations
    pub access_token: String,
    /// Access token lifetime (seconds)
    pub expires_in: u64,
    /// OpenID Connect ID token
    pub id_token: String,
    /// Refresh token (unused: every request re-authenticates)
    pub refresh_token: String,
    /// Refresh token lifetime (seconds)
    pub refresh_token_expires_in: u64,
    /// Granted scopes
    pub scope: String,
    /// Token type, normally `bearer`
    pub token_type: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Upstream PlayStation Network operations.
///
/// `options` parameters are forwarded as query parameters; a
/// `headerOverrides` object inside them is sent as request headers.
#[async_trait]
pub trait PsnApi: Send + Sync + 'static {
    /// Exchange an NPSSO session token for a short-lived access code.
    async fn exchange_npsso_for_access_code(&self, npsso: &str) -> Result<String>;

    /// Exchange an access code for an authorization context.
    async fn exchange_access_code_for_auth_tokens(&self, access_code: &str) -> Result<AuthTokens>;

    /// Profile lookup by online id.
    async fn profile_from_user_name(&self, auth: &AuthTokens, user_name: &str) -> Result<Value>;

    /// Profile lookup by account id.
    async fn profile_from_account_id(&self, auth: &AuthTokens, account_id: &str) -> Result<Value>;

    /// Shareable profile link and QR code.
    async fn profile_shareable_link(&self, auth: &AuthTokens, account_id: &str) -> Result<Value>;

    /// Account ids of a user's friends.
    async fn user_friends_account_ids(&self, auth: &AuthTokens, account_id: &str)
    -> Result<Value>;

    /// Primary presence of a user.
    async fn basic_presence(&self, auth: &AuthTokens, account_id: &str) -> Result<Value>;

    /// Games recently played by the authenticated account.
    async fn recently_played_games(&self, auth: &AuthTokens, options: &Value) -> Result<Value>;

    /// Games played by a user. `options` is forwarded as given, absent or not.
    async fn user_played_games(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: Option<&Value>,
    ) -> Result<Value>;

    /// Region of a user, named for the first supported locale.
    async fn user_region(
        &self,
        auth: &AuthTokens,
        user_name: &str,
        locales: &[String],
    ) -> Result<Value>;

    /// Devices registered to the authenticated account.
    async fn account_devices(&self, auth: &AuthTokens) -> Result<Value>;

    /// Trophies of a title within one trophy group (`"all"` for every group).
    async fn title_trophies(
        &self,
        auth: &AuthTokens,
        np_communication_id: &str,
        trophy_group_id: &str,
        options: &Value,
    ) -> Result<Value>;

    /// Trophy groups of a title.
    async fn title_trophy_groups(
        &self,
        auth: &AuthTokens,
        np_communication_id: &str,
        options: &Value,
    ) -> Result<Value>;

    /// Per-group trophy earnings of a user for one title.
    async fn user_trophy_group_earnings_for_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        np_communication_id: &str,
        options: &Value,
    ) -> Result<Value>;

    /// Trophy titles of a user.
    async fn user_titles(&self, auth: &AuthTokens, account_id: &str, options: &Value)
    -> Result<Value>;

    /// Trophies a user earned for one title and trophy group.
    async fn user_trophies_earned_for_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        np_communication_id: &str,
        trophy_group_id: &str,
        options: &Value,
    ) -> Result<Value>;

    /// Trophy level and counts of a user.
    async fn user_trophy_profile_summary(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: &Value,
    ) -> Result<Value>;

    /// Trophy summaries of a user for specific title ids (`npTitleIds`).
    async fn user_trophies_for_specific_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: Option<&Value>,
    ) -> Result<Value>;

    /// Universal search in one domain.
    async fn universal_search(
        &self,
        auth: &AuthTokens,
        search_term: &str,
        domain: &str,
    ) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_tokens_debug_redacts_secrets() {
        let tokens = AuthTokens {
            access_token: "secret-access".to_string(),
            id_token: "secret-id".to_string(),
            refresh_token: "secret-refresh".to_string(),
            token_type: "bearer".to_string(),
            ..Default::default()
        };

        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-id"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("bearer"));
    }

    #[test]
    fn auth_tokens_deserialize_from_token_response() {
        let tokens: AuthTokens = serde_json::from_str(
            r#"{"access_token":"a","token_type":"bearer","expires_in":3599,"scope":"psn:mobile.v2.core psn:clientapp","id_token":"i","refresh_token":"r","refresh_token_expires_in":5183999}"#,
        )
        .unwrap();
        assert_eq!(tokens.access_token, "a");
        assert_eq!(tokens.expires_in, 3599);
        assert_eq!(tokens.refresh_token_expires_in, 5_183_999);
    }
}
