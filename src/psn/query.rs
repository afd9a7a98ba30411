//! Mapping of caller-supplied `options` objects onto upstream requests
//!
//! Every key becomes a query parameter except `headerOverrides`, whose
//! entries are sent as HTTP headers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

/// Key holding per-request header overrides
pub const HEADER_OVERRIDES: &str = "headerOverrides";

/// Convert an options object into query pairs.
///
/// Arrays are comma-joined, `null` entries are skipped, nested objects are
/// sent as JSON. Anything other than an object yields no pairs.
#[must_use]
pub fn query_pairs(options: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = options else {
        return Vec::new();
    };

    map.iter()
        .filter(|(key, _)| key.as_str() != HEADER_OVERRIDES)
        .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
        .collect()
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Collect `options.headerOverrides` as a header map.
///
/// Entries that are not valid header names or string values are skipped.
#[must_use]
pub fn header_overrides(options: &Value) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let Some(Value::Object(overrides)) = options.get(HEADER_OVERRIDES) else {
        return headers;
    };

    for (name, value) in overrides {
        let Some(value) = value.as_str() else {
            debug!(header = %name, "Skipping non-string header override");
            continue;
        };
        match (name.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "Skipping invalid header override"),
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalars_become_pairs() {
        let mut pairs = query_pairs(&json!({
            "limit": 10,
            "offset": 0,
            "npServiceName": "trophy2",
            "includeNotEarnedTrophyIds": true
        }));
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("includeNotEarnedTrophyIds".to_string(), "true".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("npServiceName".to_string(), "trophy2".to_string()),
                ("offset".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn arrays_are_comma_joined() {
        let pairs = query_pairs(&json!({"npTitleIds": ["CUSA00000_00", "PPSA01234_00"]}));
        assert_eq!(
            pairs,
            vec![(
                "npTitleIds".to_string(),
                "CUSA00000_00,PPSA01234_00".to_string()
            )]
        );
    }

    #[test]
    fn nulls_and_header_overrides_are_not_query_params() {
        let pairs = query_pairs(&json!({
            "limit": null,
            "headerOverrides": {"Accept-Language": "fr-FR"}
        }));
        assert!(pairs.is_empty());
    }

    #[test]
    fn non_object_options_yield_nothing() {
        assert!(query_pairs(&json!(null)).is_empty());
        assert!(query_pairs(&json!("limit=5")).is_empty());
        assert!(query_pairs(&json!([1, 2])).is_empty());
    }

    #[test]
    fn header_overrides_are_extracted() {
        let headers = header_overrides(&json!({
            "headerOverrides": {
                "Accept-Language": "fr-FR",
                "X-Number": 5,
                "bad header": "x"
            }
        }));

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept-language").unwrap(), "fr-FR");
    }

    #[test]
    fn missing_header_overrides_is_empty() {
        assert!(header_overrides(&json!({"limit": 5})).is_empty());
        assert!(header_overrides(&json!(null)).is_empty());
    }
}
