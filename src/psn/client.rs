//! reqwest-backed [`PsnApi`] implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, redirect};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{AuthTokens, PsnApi, query, region};
use crate::config::UpstreamConfig;
use crate::{Error, Result};

/// Fields requested from the legacy profile endpoint
const PROFILE_FIELDS: &str = "npId,onlineId,accountId,avatarUrls,plus,aboutMe,languagesUsed,trophySummary(@default,level,progress,earnedTrophies),isOfficiallyVerified,personalDetail(@default,profilePictureUrls),personalDetailSharing,personalDetailSharingRequestMessageFlag,primaryOnlineStatus,presences(@default,@titleInfo,platform,lastOnlineDate,hasBroadcastData),requestMessageFlag,blocking,friendRelation,following,consoleAvailability";

/// Persisted query hash of `getUserGameList`
const USER_GAME_LIST_HASH: &str =
    "e780a6d8b921ef0c59ec01ea5c5255671272ca0d819edb61320914cf7a78b3ae";

const DEFAULT_RECENT_LIMIT: u64 = 50;
const DEFAULT_RECENT_CATEGORIES: &str = "ps4_game,ps5_native_game";

/// PSN client over HTTPS
///
/// Stateless apart from the connection pool: every call carries the
/// authorization context it was handed.
pub struct HttpPsnClient {
    pub(super) http: Client,
    pub(super) config: UpstreamConfig,
}

impl HttpPsnClient {
    /// Create a client for the configured upstream endpoints
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            // The authorize step answers with a redirect whose target carries the code
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Append path segments (percent-encoded) to a configured base URL
    fn url(base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| Error::Config(format!("Invalid upstream URL '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("Upstream URL cannot be a base: {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        Self::url(&self.config.api_url, segments)
    }

    fn user_url(&self, account_id: &str, tail: &[&str]) -> Result<Url> {
        let mut segments = vec!["userProfile", "v1", "internal", "users", account_id];
        segments.extend_from_slice(tail);
        self.api_url(&segments)
    }

    /// GET with caller options mapped onto query and headers
    async fn get(&self, auth: &AuthTokens, url: Url, options: Option<&Value>) -> Result<Value> {
        let mut request = self.http.get(url);
        if let Some(options) = options {
            request = request
                .query(&query::query_pairs(options))
                .headers(query::header_overrides(options));
        }
        self.send(auth, request).await
    }

    /// Send an authorized request and surface upstream-reported errors
    async fn send(&self, auth: &AuthTokens, request: RequestBuilder) -> Result<Value> {
        let response = request.bearer_auth(&auth.access_token).send().await?;

        let status = response.status();
        debug!(url = %response.url().path(), status = %status, "Upstream response");

        let body = response.text().await?;
        if body.trim().is_empty() {
            if status.is_success() {
                return Ok(Value::Null);
            }
            return Err(Error::upstream(format!("Unexpected Response: HTTP {status}")));
        }

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(Error::upstream(format!("Unexpected Response: HTTP {status}")));
            }
            Err(e) => return Err(e.into()),
        };

        match upstream_error(&value) {
            Some(message) => Err(Error::Upstream(message)),
            None => Ok(value),
        }
    }
}

/// Error message carried by an upstream `error` member, if any
fn upstream_error(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("Unexpected Response");
    Some(message.to_string())
}

/// First message of a GraphQL `errors` array, if any
fn graphql_error(value: &Value) -> Option<String> {
    let errors = value.get("errors")?.as_array()?;
    let first = errors.first()?;
    Some(
        first
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unexpected Response")
            .to_string(),
    )
}

/// Variables of the `getUserGameList` query
fn recently_played_variables(options: &Value) -> Value {
    // Forwarded as given: 2.5 stays 2.5
    let limit = options
        .get("limit")
        .filter(|v| v.is_number())
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_RECENT_LIMIT));

    let categories = match options.get("categories") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::String(s)) => s.clone(),
        _ => DEFAULT_RECENT_CATEGORIES.to_string(),
    };

    json!({ "limit": limit, "categories": categories })
}

#[async_trait]
impl PsnApi for HttpPsnClient {
    async fn exchange_npsso_for_access_code(&self, npsso: &str) -> Result<String> {
        self.request_access_code(npsso).await
    }

    async fn exchange_access_code_for_auth_tokens(&self, access_code: &str) -> Result<AuthTokens> {
        self.request_auth_tokens(access_code).await
    }

    async fn profile_from_user_name(&self, auth: &AuthTokens, user_name: &str) -> Result<Value> {
        let mut url = Self::url(&self.config.legacy_profile_url, &[user_name, "profile2"])?;
        url.query_pairs_mut().append_pair("fields", PROFILE_FIELDS);
        self.get(auth, url, None).await
    }

    async fn profile_from_account_id(&self, auth: &AuthTokens, account_id: &str) -> Result<Value> {
        let url = self.user_url(account_id, &["profiles"])?;
        self.get(auth, url, None).await
    }

    async fn profile_shareable_link(&self, auth: &AuthTokens, account_id: &str) -> Result<Value> {
        let url = self.user_url(account_id, &["shareable", "profileLink"])?;
        self.get(auth, url, None).await
    }

    async fn user_friends_account_ids(
        &self,
        auth: &AuthTokens,
        account_id: &str,
    ) -> Result<Value> {
        let url = self.user_url(account_id, &["friends"])?;
        self.get(auth, url, None).await
    }

    async fn basic_presence(&self, auth: &AuthTokens, account_id: &str) -> Result<Value> {
        let mut url = self.user_url(account_id, &["basicPresences"])?;
        url.query_pairs_mut().append_pair("type", "primary");
        self.get(auth, url, None).await
    }

    async fn recently_played_games(&self, auth: &AuthTokens, options: &Value) -> Result<Value> {
        let mut url = Self::url(&self.config.graphql_url, &[])?;
        url.query_pairs_mut()
            .append_pair("operationName", "getUserGameList")
            .append_pair("variables", &recently_played_variables(options).to_string())
            .append_pair(
                "extensions",
                &json!({
                    "persistedQuery": { "version": 1, "sha256Hash": USER_GAME_LIST_HASH }
                })
                .to_string(),
            );

        let request = self
            .http
            .get(url)
            .headers(query::header_overrides(options));
        let value = self.send(auth, request).await?;

        match graphql_error(&value) {
            Some(message) => Err(Error::Upstream(message)),
            None => Ok(value),
        }
    }

    async fn user_played_games(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: Option<&Value>,
    ) -> Result<Value> {
        let url = self.api_url(&["gamelist", "v2", "users", account_id, "titles"])?;
        self.get(auth, url, options).await
    }

    async fn user_region(
        &self,
        auth: &AuthTokens,
        user_name: &str,
        locales: &[String],
    ) -> Result<Value> {
        let profile = self.profile_from_user_name(auth, user_name).await?;
        region::from_profile(&profile, locales)
    }

    async fn account_devices(&self, auth: &AuthTokens) -> Result<Value> {
        let mut url = Self::url(&self.config.devices_url, &[])?;
        url.query_pairs_mut()
            .append_pair("includeFields", "device,systemData")
            .append_pair("platform", "PS5,PS4,PS3,PSVita");
        self.get(auth, url, None).await
    }

    async fn title_trophies(
        &self,
        auth: &AuthTokens,
        np_communication_id: &str,
        trophy_group_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&[
            "trophy",
            "v1",
            "npCommunicationIds",
            np_communication_id,
            "trophyGroups",
            trophy_group_id,
            "trophies",
        ])?;
        self.get(auth, url, Some(options)).await
    }

    async fn title_trophy_groups(
        &self,
        auth: &AuthTokens,
        np_communication_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&[
            "trophy",
            "v1",
            "npCommunicationIds",
            np_communication_id,
            "trophyGroups",
        ])?;
        self.get(auth, url, Some(options)).await
    }

    async fn user_trophy_group_earnings_for_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        np_communication_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&[
            "trophy",
            "v1",
            "users",
            account_id,
            "npCommunicationIds",
            np_communication_id,
            "trophyGroups",
        ])?;
        self.get(auth, url, Some(options)).await
    }

    async fn user_titles(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&["trophy", "v1", "users", account_id, "trophyTitles"])?;
        self.get(auth, url, Some(options)).await
    }

    async fn user_trophies_earned_for_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        np_communication_id: &str,
        trophy_group_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&[
            "trophy",
            "v1",
            "users",
            account_id,
            "npCommunicationIds",
            np_communication_id,
            "trophyGroups",
            trophy_group_id,
            "trophies",
        ])?;
        self.get(auth, url, Some(options)).await
    }

    async fn user_trophy_profile_summary(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: &Value,
    ) -> Result<Value> {
        let url = self.api_url(&["trophy", "v1", "users", account_id, "trophySummary"])?;
        self.get(auth, url, Some(options)).await
    }

    async fn user_trophies_for_specific_title(
        &self,
        auth: &AuthTokens,
        account_id: &str,
        options: Option<&Value>,
    ) -> Result<Value> {
        let url = self.api_url(&[
            "trophy",
            "v1",
            "users",
            account_id,
            "titles",
            "trophyTitles",
        ])?;
        self.get(auth, url, options).await
    }

    async fn universal_search(
        &self,
        auth: &AuthTokens,
        search_term: &str,
        domain: &str,
    ) -> Result<Value> {
        let url = self.api_url(&["search", "v1", "universalSearch"])?;
        let request = self.http.post(url).json(&json!({
            "searchTerm": search_term,
            "domainRequests": [{ "domain": domain }]
        }));
        self.send(auth, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn url_appends_encoded_segments() {
        let url = HttpPsnClient::url(
            "https://m.np.playstation.com/api",
            &["trophy", "v1", "users", "me", "trophyTitles"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://m.np.playstation.com/api/trophy/v1/users/me/trophyTitles"
        );

        let url = HttpPsnClient::url("https://example.com/users/", &["a b/c", "profile2"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/users/a%20b%2Fc/profile2");
    }

    #[test]
    fn url_rejects_invalid_base() {
        assert!(matches!(
            HttpPsnClient::url("not a url", &["x"]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn upstream_error_reads_message() {
        let value = json!({
            "error": {
                "referenceId": "abc",
                "code": 2_240_526,
                "message": "Not permitted by access control"
            }
        });
        assert_eq!(
            upstream_error(&value).as_deref(),
            Some("Not permitted by access control")
        );
        assert_eq!(
            upstream_error(&json!({"error": {"code": 1}})).as_deref(),
            Some("Unexpected Response")
        );
        assert_eq!(upstream_error(&json!({"error": null})), None);
        assert_eq!(upstream_error(&json!({"profile": {}})), None);
    }

    #[test]
    fn graphql_error_reads_first_message() {
        let value = json!({"errors": [{"message": "PersistedQueryNotFound"}]});
        assert_eq!(
            graphql_error(&value).as_deref(),
            Some("PersistedQueryNotFound")
        );
        assert_eq!(graphql_error(&json!({"errors": []})), None);
        assert_eq!(graphql_error(&json!({"data": {}})), None);
    }

    #[test]
    fn recently_played_variables_default() {
        assert_eq!(
            recently_played_variables(&json!({})),
            json!({"limit": 50, "categories": "ps4_game,ps5_native_game"})
        );
    }

    #[test]
    fn recently_played_variables_keep_fractional_limit() {
        assert_eq!(
            recently_played_variables(&json!({"limit": 2.5}))["limit"],
            json!(2.5)
        );
        assert_eq!(
            recently_played_variables(&json!({"limit": 100.0}))["limit"],
            json!(100.0)
        );
        assert_eq!(
            recently_played_variables(&json!({"limit": "7"}))["limit"],
            json!(50)
        );
    }

    #[test]
    fn recently_played_variables_from_options() {
        assert_eq!(
            recently_played_variables(&json!({"limit": 5, "categories": ["ps5_native_game"]})),
            json!({"limit": 5, "categories": "ps5_native_game"})
        );
    }
}
