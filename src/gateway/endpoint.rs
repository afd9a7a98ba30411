//! The authenticated gateway endpoint
//!
//! Every route runs the same sequence:
//!
//! 1. read fields from the JSON body
//! 2. check required fields, then any endpoint-specific structure (400)
//! 3. exchange the NPSSO for an access code, then for auth tokens
//! 4. call the endpoint's upstream operation, filling defaults
//! 5. answer `{ message, data }` (200), or `{ error, details }` (500) when
//!    step 3 or 4 failed
//!
//! Routes differ only in the [`Endpoint`] record describing them.

use serde_json::Value;
use tracing::error;

use super::envelope::Envelope;
use super::validation::{
    ALL_TROPHY_GROUPS, Params, ValidationError, check_recently_played, check_specific_titles,
};
use crate::Result;
use crate::psn::{AuthTokens, PsnApi, region::DEFAULT_LOCALES};

/// Body field carrying the NPSSO credential
pub const CREDENTIAL_FIELD: &str = "npsso";

/// Extra structural check run after the required-field check
pub type Check = fn(&Params) -> std::result::Result<(), ValidationError>;

/// Upstream operation behind an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Profile by online id
    ProfileFromUserName,
    /// Profile by account id
    ProfileFromAccountId,
    /// Shareable profile link
    ProfileShareableLink,
    /// Friends' account ids
    UserFriendsAccountIds,
    /// Primary presence
    BasicPresence,
    /// Recently played games of the signed-in account
    RecentlyPlayedGames,
    /// Played games of a user
    UserPlayedGames,
    /// Region of a user
    UserRegion,
    /// Devices of the signed-in account
    AccountDevices,
    /// Trophies of a title
    TitleTrophies,
    /// Trophy groups of a title
    TitleTrophyGroups,
    /// Per-group trophy earnings of a user for a title
    UserTrophyGroupEarningsForTitle,
    /// Trophy titles of a user
    UserTitles,
    /// Trophies a user earned for a title
    UserTrophiesEarnedForTitle,
    /// Trophy profile summary
    UserTrophyProfileSummary,
    /// Trophy summaries for specific title ids
    UserTrophiesForSpecificTitle,
    /// Universal search
    UniversalSearch,
}

impl Operation {
    /// Call the operation with fields taken from `params`, applying defaults
    pub async fn invoke(
        self,
        api: &dyn PsnApi,
        auth: &AuthTokens,
        params: &Params,
    ) -> Result<Value> {
        match self {
            Self::ProfileFromUserName => {
                api.profile_from_user_name(auth, &params.text("username"))
                    .await
            }
            Self::ProfileFromAccountId => {
                api.profile_from_account_id(auth, &params.text("accountId"))
                    .await
            }
            Self::ProfileShareableLink => {
                api.profile_shareable_link(auth, &params.text("accountId"))
                    .await
            }
            Self::UserFriendsAccountIds => {
                api.user_friends_account_ids(auth, &params.text("accountId"))
                    .await
            }
            Self::BasicPresence => api.basic_presence(auth, &params.text("accountId")).await,
            Self::RecentlyPlayedGames => api.recently_played_games(auth, &params.options()).await,
            Self::UserPlayedGames => {
                api.user_played_games(auth, &params.text("accountId"), params.raw_options())
                    .await
            }
            Self::UserRegion => {
                api.user_region(
                    auth,
                    &params.text("username"),
                    &params.locales(DEFAULT_LOCALES),
                )
                .await
            }
            Self::AccountDevices => api.account_devices(auth).await,
            Self::TitleTrophies => {
                api.title_trophies(
                    auth,
                    &params.text("npCommunicationId"),
                    &params.text_or("trophyGroupId", ALL_TROPHY_GROUPS),
                    &params.options(),
                )
                .await
            }
            Self::TitleTrophyGroups => {
                api.title_trophy_groups(auth, &params.text("npCommunicationId"), &params.options())
                    .await
            }
            Self::UserTrophyGroupEarningsForTitle => {
                api.user_trophy_group_earnings_for_title(
                    auth,
                    &params.text("accountId"),
                    &params.text("npCommunicationId"),
                    &params.options(),
                )
                .await
            }
            Self::UserTitles => {
                api.user_titles(auth, &params.text("accountId"), &params.options())
                    .await
            }
            Self::UserTrophiesEarnedForTitle => {
                api.user_trophies_earned_for_title(
                    auth,
                    &params.text("accountId"),
                    &params.text("npCommunicationId"),
                    &params.text_or("trophyGroupId", ALL_TROPHY_GROUPS),
                    &params.options(),
                )
                .await
            }
            Self::UserTrophyProfileSummary => {
                api.user_trophy_profile_summary(auth, &params.text("accountId"), &params.options())
                    .await
            }
            Self::UserTrophiesForSpecificTitle => {
                api.user_trophies_for_specific_title(
                    auth,
                    &params.text("accountId"),
                    params.raw_options(),
                )
                .await
            }
            Self::UniversalSearch => {
                api.universal_search(auth, &params.text("searchTerm"), &params.text("domain"))
                    .await
            }
        }
    }
}

/// One gateway route
#[derive(Debug)]
pub struct Endpoint {
    /// Route path, as published
    pub path: &'static str,
    /// Fields that must be present and truthy
    pub required: &'static [&'static str],
    /// Structural check beyond required fields
    pub check: Option<Check>,
    /// Upstream operation
    pub operation: Operation,
    /// Success line of the 200 envelope
    pub success: &'static str,
    /// Fixed description of the 500 envelope
    pub failure: &'static str,
}

impl Endpoint {
    /// The published path and its trailing-slash twin
    #[must_use]
    pub fn paths(&self) -> [String; 2] {
        let twin = match self.path.strip_suffix('/') {
            Some(trimmed) => trimmed.to_string(),
            None => format!("{}/", self.path),
        };
        [self.path.to_string(), twin]
    }

    /// Validate a request body into parameters
    pub fn validate(&self, body: Value) -> std::result::Result<Params, ValidationError> {
        let params = Params::from_value(body);

        let missing = params.missing(self.required);
        if !missing.is_empty() {
            return Err(ValidationError::missing(self.required, missing));
        }

        if let Some(check) = self.check {
            check(&params)?;
        }

        Ok(params)
    }

    /// Authenticate with the request's credential, then run the operation
    pub async fn execute(&self, api: &dyn PsnApi, params: &Params) -> Result<Value> {
        let npsso = params.text(CREDENTIAL_FIELD);
        let access_code = api.exchange_npsso_for_access_code(&npsso).await?;
        let auth = api.exchange_access_code_for_auth_tokens(&access_code).await?;
        self.operation.invoke(api, &auth, params).await
    }

    /// Full request lifecycle, ending in exactly one envelope
    pub async fn process(&self, api: &dyn PsnApi, body: Value) -> Envelope {
        // Rejections are answered, not logged
        let params = match self.validate(body) {
            Ok(params) => params,
            Err(err) => return err.into(),
        };

        match self.execute(api, &params).await {
            Ok(data) => Envelope::success(self.success, data),
            Err(e) => {
                error!(path = %self.path, error = %e, "{}", self.failure);
                Envelope::failed(self.failure, e.to_string())
            }
        }
    }
}

/// All gateway routes
pub static ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        path: "/api/users/profile/username/",
        required: &["username", "npsso"],
        check: None,
        operation: Operation::ProfileFromUserName,
        success: "User profile retrieved successfully.",
        failure: "Error retrieving user profile",
    },
    Endpoint {
        path: "/api/users/profile/account/",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::ProfileFromAccountId,
        success: "User profile by account ID retrieved successfully.",
        failure: "Error retrieving user profile",
    },
    Endpoint {
        path: "/api/users/shareable-link",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::ProfileShareableLink,
        success: "Shareable link generated successfully.",
        failure: "Error generating shareable link",
    },
    Endpoint {
        path: "/api/users/friends",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::UserFriendsAccountIds,
        success: "Friends list retrieved successfully.",
        failure: "Error retrieving friends",
    },
    Endpoint {
        path: "/api/users/presence",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::BasicPresence,
        success: "Basic presence retrieved successfully.",
        failure: "Error retrieving presence",
    },
    Endpoint {
        path: "/api/users/recently-played",
        required: &["accountId", "npsso"],
        check: Some(check_recently_played),
        operation: Operation::RecentlyPlayedGames,
        success: "Recently played games retrieved successfully.",
        failure: "Error retrieving recently played games",
    },
    Endpoint {
        path: "/api/users/played-games",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::UserPlayedGames,
        success: "Played games retrieved successfully.",
        failure: "Error retrieving played games",
    },
    Endpoint {
        path: "/api/users/region/",
        required: &["npsso", "username"],
        check: None,
        operation: Operation::UserRegion,
        success: "User region retrieved successfully.",
        failure: "Error retrieving region",
    },
    Endpoint {
        path: "/api/users/devices",
        required: &["npsso"],
        check: None,
        operation: Operation::AccountDevices,
        success: "Account devices retrieved successfully.",
        failure: "Error retrieving account devices",
    },
    Endpoint {
        path: "/api/trophies/title/",
        required: &["npCommunicationId", "npsso"],
        check: None,
        operation: Operation::TitleTrophies,
        success: "Title trophies retrieved successfully.",
        failure: "Error retrieving title trophies",
    },
    Endpoint {
        path: "/api/trophies/title/groups",
        required: &["npCommunicationId", "npsso"],
        check: None,
        operation: Operation::TitleTrophyGroups,
        success: "Title trophy groups retrieved successfully.",
        failure: "Error retrieving trophy groups",
    },
    Endpoint {
        path: "/api/users/trophy-groups/",
        required: &["accountId", "npCommunicationId", "npsso"],
        check: None,
        operation: Operation::UserTrophyGroupEarningsForTitle,
        success: "Trophy group earnings retrieved successfully.",
        failure: "Error retrieving trophy group earnings",
    },
    Endpoint {
        path: "/api/users/titles",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::UserTitles,
        success: "User titles retrieved successfully.",
        failure: "Error retrieving user titles",
    },
    Endpoint {
        path: "/api/users/trophies/earned",
        required: &["accountId", "npCommunicationId", "npsso"],
        check: None,
        operation: Operation::UserTrophiesEarnedForTitle,
        success: "Earned trophies retrieved successfully.",
        failure: "Error retrieving earned trophies",
    },
    Endpoint {
        path: "/api/users/trophy-summary",
        required: &["accountId", "npsso"],
        check: None,
        operation: Operation::UserTrophyProfileSummary,
        success: "Trophy profile summary retrieved successfully.",
        failure: "Error retrieving trophy profile summary",
    },
    Endpoint {
        path: "/api/users/trophies/specific-titles",
        required: &["accountId", "npsso"],
        check: Some(check_specific_titles),
        operation: Operation::UserTrophiesForSpecificTitle,
        success: "Trophies for specific titles retrieved successfully.",
        failure: "Error retrieving trophies for specific titles",
    },
    Endpoint {
        path: "/api/search/universal",
        required: &["searchTerm", "domain", "npsso"],
        check: None,
        operation: Operation::UniversalSearch,
        success: "Universal search completed successfully.",
        failure: "Error performing universal search",
    },
];

/// Look up an endpoint by its published path
#[must_use]
pub fn find(path: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|e| e.path == path)
}
