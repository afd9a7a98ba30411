//! HTTP client tests against a mock PSN
//!
//! Every upstream base URL points at one wiremock server under a distinct
//! path prefix.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use psn_gateway::Error;
use psn_gateway::config::UpstreamConfig;
use psn_gateway::psn::{AuthTokens, HttpPsnClient, PsnApi};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpPsnClient {
    let base = server.uri();
    let config = UpstreamConfig {
        auth_url: format!("{base}/oauth"),
        api_url: format!("{base}/api"),
        legacy_profile_url: format!("{base}/legacy/users"),
        graphql_url: format!("{base}/graphql/op"),
        devices_url: format!("{base}/devices/me"),
        ..Default::default()
    };
    HttpPsnClient::new(&config).unwrap()
}

fn auth() -> AuthTokens {
    AuthTokens {
        access_token: "tok".to_string(),
        token_type: "bearer".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn access_code_is_read_from_redirect_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/authorize"))
        .and(query_param("response_type", "code"))
        .and(query_param("access_type", "offline"))
        .and(header("cookie", "npsso=abc"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            "com.scee.psxandroid.scecompcall://redirect/?code=v3.abc&cid=42",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let code = client(&server)
        .exchange_npsso_for_access_code("abc")
        .await
        .unwrap();
    assert_eq!(code, "v3.abc");
}

#[tokio::test]
async fn redirect_without_code_is_an_invalid_npsso() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/authorize"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            "com.scee.psxandroid.scecompcall://redirect/?error=login_required",
        ))
        .mount(&server)
        .await;

    let err = client(&server)
        .exchange_npsso_for_access_code("expired")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert!(err.to_string().contains("Is your NPSSO code valid?"));
}

#[tokio::test]
async fn missing_redirect_is_an_invalid_npsso() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/authorize"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server)
        .exchange_npsso_for_access_code("expired")
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("There was a problem retrieving your PSN access code."));
}

#[tokio::test]
async fn access_code_is_traded_for_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("code=v3.abc"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("token_format=jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access",
            "token_type": "bearer",
            "expires_in": 3599,
            "scope": "psn:mobile.v2.core psn:clientapp",
            "id_token": "id",
            "refresh_token": "refresh",
            "refresh_token_expires_in": 5_183_999
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client(&server)
        .exchange_access_code_for_auth_tokens("v3.abc")
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "access");
    assert_eq!(tokens.expires_in, 3599);
}

#[tokio::test]
async fn rejected_access_code_surfaces_error_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid access code"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .exchange_access_code_for_auth_tokens("stale")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid access code");
}

#[tokio::test]
async fn data_operations_send_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/userProfile/v1/internal/users/123/profiles"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"onlineId": "xelnia"})))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client(&server)
        .profile_from_account_id(&auth(), "123")
        .await
        .unwrap();
    assert_eq!(profile, json!({"onlineId": "xelnia"}));
}

#[tokio::test]
async fn upstream_error_member_becomes_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/userProfile/v1/internal/users/123/friends"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "referenceId": "r",
                "code": 2_240_526,
                "message": "Not permitted by access control"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .user_friends_account_ids(&auth(), "123")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(ref m) if m == "Not permitted by access control"));
}

#[tokio::test]
async fn options_become_query_and_header_overrides() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/trophy/v1/npCommunicationIds/NPWR20188_00/trophyGroups/all/trophies"))
        .and(query_param("npServiceName", "trophy"))
        .and(query_param("limit", "10"))
        .and(header("accept-language", "fr-FR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trophies": []})))
        .expect(1)
        .mount(&server)
        .await;

    let options = json!({
        "npServiceName": "trophy",
        "limit": 10,
        "headerOverrides": {"Accept-Language": "fr-FR"}
    });
    let data = client(&server)
        .title_trophies(&auth(), "NPWR20188_00", "all", &options)
        .await
        .unwrap();
    assert_eq!(data, json!({"trophies": []}));
}

#[tokio::test]
async fn region_is_derived_from_legacy_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/legacy/users/xelnia/profile2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "profile": {"onlineId": "xelnia", "npId": STANDARD.encode("xelnia@a6.us")}
        })))
        .mount(&server)
        .await;

    let region = client(&server)
        .user_region(&auth(), "xelnia", &["en".to_string()])
        .await
        .unwrap();
    assert_eq!(region, json!({"code": "US", "name": "United States"}));
}

#[tokio::test]
async fn recently_played_uses_persisted_query_and_reports_graphql_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/graphql/op"))
        .and(query_param("operationName", "getUserGameList"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errors": [{"message": "PersistedQueryNotFound"}]})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .recently_played_games(&auth(), &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "PersistedQueryNotFound");
}

#[tokio::test]
async fn devices_are_listed_for_every_platform() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/me"))
        .and(query_param("platform", "PS5,PS4,PS3,PSVita"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"deviceId": "d1"}])))
        .mount(&server)
        .await;

    let devices = client(&server).account_devices(&auth()).await.unwrap();
    assert_eq!(devices, json!([{"deviceId": "d1"}]));
}

#[tokio::test]
async fn universal_search_posts_domain_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search/v1/universalSearch"))
        .and(body_json(json!({
            "searchTerm": "xelnia",
            "domainRequests": [{"domain": "SocialAllAccounts"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"domainResponses": []})))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server)
        .universal_search(&auth(), "xelnia", "SocialAllAccounts")
        .await
        .unwrap();
    assert_eq!(data, json!({"domainResponses": []}));
}

/// Mount a GET at `route` answering `{"ok": true}`, expected exactly once
async fn expect_get(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn shareable_link_url() {
    let server = MockServer::start().await;
    expect_get(&server, "/api/userProfile/v1/internal/users/123/shareable/profileLink").await;

    let data = client(&server)
        .profile_shareable_link(&auth(), "123")
        .await
        .unwrap();
    assert_eq!(data, json!({"ok": true}));
}

#[tokio::test]
async fn basic_presence_asks_for_primary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/userProfile/v1/internal/users/123/basicPresences"))
        .and(query_param("type", "primary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"basicPresence": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server).basic_presence(&auth(), "123").await.unwrap();
    assert_eq!(data, json!({"basicPresence": {}}));
}

#[tokio::test]
async fn played_games_without_options_sends_no_query() {
    let server = MockServer::start().await;
    expect_get(&server, "/api/gamelist/v2/users/me/titles").await;

    client(&server)
        .user_played_games(&auth(), "me", None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn played_games_forwards_options() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gamelist/v2/users/me/titles"))
        .and(query_param("categories", "ps4_game,ps5_native_game"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"titles": []})))
        .expect(1)
        .mount(&server)
        .await;

    let options = json!({"categories": ["ps4_game", "ps5_native_game"], "limit": 20});
    client(&server)
        .user_played_games(&auth(), "me", Some(&options))
        .await
        .unwrap();
}

#[tokio::test]
async fn title_trophy_groups_url() {
    let server = MockServer::start().await;
    expect_get(&server, "/api/trophy/v1/npCommunicationIds/NPWR20188_00/trophyGroups").await;

    client(&server)
        .title_trophy_groups(&auth(), "NPWR20188_00", &json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn user_trophy_group_earnings_url() {
    let server = MockServer::start().await;
    expect_get(
        &server,
        "/api/trophy/v1/users/me/npCommunicationIds/NPWR20188_00/trophyGroups",
    )
    .await;

    client(&server)
        .user_trophy_group_earnings_for_title(&auth(), "me", "NPWR20188_00", &json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn user_titles_url() {
    let server = MockServer::start().await;
    expect_get(&server, "/api/trophy/v1/users/me/trophyTitles").await;

    client(&server)
        .user_titles(&auth(), "me", &json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn user_trophies_earned_url() {
    let server = MockServer::start().await;
    expect_get(
        &server,
        "/api/trophy/v1/users/me/npCommunicationIds/NPWR20188_00/trophyGroups/001/trophies",
    )
    .await;

    client(&server)
        .user_trophies_earned_for_title(&auth(), "me", "NPWR20188_00", "001", &json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn trophy_profile_summary_url() {
    let server = MockServer::start().await;
    expect_get(&server, "/api/trophy/v1/users/me/trophySummary").await;

    client(&server)
        .user_trophy_profile_summary(&auth(), "me", &json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn specific_titles_join_title_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/trophy/v1/users/me/titles/trophyTitles"))
        .and(query_param("npTitleIds", "CUSA00000_00,PPSA11111_00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"titles": []})))
        .expect(1)
        .mount(&server)
        .await;

    let options = json!({"npTitleIds": ["CUSA00000_00", "PPSA11111_00"]});
    let data = client(&server)
        .user_trophies_for_specific_title(&auth(), "me", Some(&options))
        .await
        .unwrap();
    assert_eq!(data, json!({"titles": []}));
}

#[tokio::test]
async fn non_json_failure_reports_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/trophy/v1/users/me/trophySummary"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("content-type", "text/plain")
                .set_body_string("upstream unavailable"),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .user_trophy_profile_summary(&auth(), "me", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected Response: HTTP 503 Service Unavailable"
    );
}
