//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// PlayStation Network endpoints and client settings
    pub upstream: UpstreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size: 1024 * 1024, // 1MB
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Upstream (PlayStation Network) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// OAuth authorization server (`/authorize` and `/token` live below it)
    pub auth_url: String,
    /// Mobile API root (profiles, trophies, game lists, search)
    pub api_url: String,
    /// Legacy community profile API (profile lookup by online id)
    pub legacy_profile_url: String,
    /// GraphQL persisted-query endpoint
    pub graphql_url: String,
    /// Device management endpoint for the signed-in account
    pub devices_url: String,
    /// Timeout applied to every upstream request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// User-Agent sent upstream
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://ca.account.sony.com/api/authz/v3/oauth".to_string(),
            api_url: "https://m.np.playstation.com/api".to_string(),
            legacy_profile_url: "https://us-prof.np.community.playstation.net/userProfile/v1/users"
                .to_string(),
            graphql_url: "https://web.np.playstation.com/api/graphql/v1/op".to_string(),
            devices_url: "https://dms.api.playstation.com/api/v1/devices/accounts/me".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("psn-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (PSN_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("PSN_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();
        config.expand_env_vars()?;

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in upstream values
    fn expand_env_vars(&mut self) -> Result<()> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .map_err(|e| Error::Internal(e.to_string()))?;

        let upstream = &mut self.upstream;
        for value in [
            &mut upstream.auth_url,
            &mut upstream.api_url,
            &mut upstream.legacy_profile_url,
            &mut upstream.graphql_url,
            &mut upstream.devices_url,
            &mut upstream.user_agent,
        ] {
            *value = Self::expand_string(&re, value);
        }

        Ok(())
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}

/// Durations written as `"30s"`, `"5m"` or `"250ms"`; a bare number is seconds
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize as whole seconds, or milliseconds below one second
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize from a suffixed string
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(s.trim()).ok_or_else(|| de::Error::custom(format!("invalid duration: {s}")))
    }

    fn parse(s: &str) -> Option<Duration> {
        // "ms" before "s": both end in 's'
        if let Some(ms) = s.strip_suffix("ms") {
            return ms.trim().parse().ok().map(Duration::from_millis);
        }
        if let Some(mins) = s.strip_suffix('m') {
            return mins
                .trim()
                .parse::<u64>()
                .ok()
                .map(|m| Duration::from_secs(m * 60));
        }
        s.strip_suffix('s')
            .unwrap_or(s)
            .trim()
            .parse()
            .ok()
            .map(Duration::from_secs)
    }

}
