//! Region lookup from a user's NP id
//!
//! The legacy profile carries `npId`, a base64 string such as
//! `"user@a6.us"`. The suffix after the last dot is the account's
//! region code.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use crate::{Error, Result};

/// Locales applied when the caller supplies none
pub const DEFAULT_LOCALES: &[&str] = &["en"];

/// English display names of PSN store regions
const ENGLISH_REGION_NAMES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("BH", "Bahrain"),
    ("BO", "Bolivia"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("CR", "Costa Rica"),
    ("CY", "Cyprus"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EC", "Ecuador"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("GT", "Guatemala"),
    ("HK", "Hong Kong SAR China"),
    ("HN", "Honduras"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("ID", "Indonesia"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("KW", "Kuwait"),
    ("LB", "Lebanon"),
    ("LU", "Luxembourg"),
    ("MT", "Malta"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NI", "Nicaragua"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("OM", "Oman"),
    ("PA", "Panama"),
    ("PE", "Peru"),
    ("PH", "Philippines"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("PY", "Paraguay"),
    ("QA", "Qatar"),
    ("RO", "Romania"),
    ("RU", "Russia"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("SV", "El Salvador"),
    ("TH", "Thailand"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("UY", "Uruguay"),
    ("ZA", "South Africa"),
];

/// Extract the upper-cased region code from a base64 NP id.
pub fn region_code(np_id: &str) -> Result<String> {
    let decoded = STANDARD
        .decode(np_id)
        .map_err(|e| Error::upstream(format!("Invalid npId: {e}")))?;
    let decoded =
        String::from_utf8(decoded).map_err(|e| Error::upstream(format!("Invalid npId: {e}")))?;

    let (_, domain) = decoded
        .rsplit_once('@')
        .ok_or_else(|| Error::upstream("Invalid npId: missing domain"))?;

    match domain.rsplit_once('.') {
        Some((_, code)) if !code.is_empty() => Ok(code.to_ascii_uppercase()),
        _ => Err(Error::upstream("Invalid npId: missing region")),
    }
}

/// Display name of `code` for the first requested locale we can name it in.
///
/// An empty list means the default locale. Falls back to the code itself.
#[must_use]
pub fn region_name(code: &str, locales: &[String]) -> String {
    let english = locales.is_empty()
        || locales.iter().any(|locale| {
            let language = locale.split(['-', '_']).next().unwrap_or_default();
            language.eq_ignore_ascii_case("en")
        });

    if english {
        if let Some((_, name)) = ENGLISH_REGION_NAMES.iter().find(|(c, _)| *c == code) {
            return (*name).to_string();
        }
    }

    code.to_string()
}

/// Build the region result from a legacy profile response.
pub fn from_profile(profile: &Value, locales: &[String]) -> Result<Value> {
    let np_id = profile
        .pointer("/profile/npId")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::upstream("Unexpected Response: profile has no npId"))?;

    let code = region_code(np_id)?;
    let name = region_name(&code, locales);

    Ok(json!({ "code": code, "name": name }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn np_id(raw: &str) -> String {
        STANDARD.encode(raw)
    }

    fn en() -> Vec<String> {
        vec!["en".to_string()]
    }

    #[test]
    fn region_code_is_domain_suffix() {
        assert_eq!(region_code(&np_id("xelnia@a6.us")).unwrap(), "US");
        assert_eq!(region_code(&np_id("some.one@b7.fr")).unwrap(), "FR");
    }

    #[test]
    fn region_code_rejects_garbage() {
        assert!(region_code("***").is_err());
        assert!(region_code(&np_id("no-domain")).is_err());
        assert!(region_code(&np_id("user@nodot")).is_err());
    }

    #[test]
    fn english_locales_get_names() {
        assert_eq!(region_name("GB", &en()), "United Kingdom");
        assert_eq!(region_name("US", &["en-US".to_string()]), "United States");
    }

    #[test]
    fn empty_locale_list_uses_default_names() {
        assert_eq!(region_name("US", &[]), "United States");
    }

    #[test]
    fn unsupported_locale_or_code_falls_back_to_code() {
        assert_eq!(region_name("FR", &["fr".to_string()]), "FR");
        assert_eq!(region_name("ZZ", &en()), "ZZ");
    }

    #[test]
    fn from_profile_builds_code_and_name() {
        let profile = json!({"profile": {"onlineId": "xelnia", "npId": np_id("xelnia@a6.us")}});
        let region = from_profile(&profile, &en()).unwrap();
        assert_eq!(region, json!({"code": "US", "name": "United States"}));
    }

    #[test]
    fn from_profile_without_np_id_fails() {
        let err = from_profile(&json!({"profile": {}}), &en()).unwrap_err();
        assert!(err.to_string().contains("npId"));
    }
}
