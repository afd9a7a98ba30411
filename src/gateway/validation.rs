//! Request body validation
//!
//! Bodies are loosely typed JSON. A field counts as present when it is
//! truthy: `null`, `false`, `0`, `NaN` and `""` are treated like a missing
//! field, while objects and arrays (even empty ones) are present.

use serde_json::{Map, Value, json};

/// Categories accepted by the recently-played filter
pub const VALID_CATEGORIES: &[&str] = &["ps4_game", "ps5_native_game"];

/// Trophy group selector used when none is given
pub const ALL_TROPHY_GROUPS: &str = "all";

/// A rejected request: what to tell the caller and which fields were at fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Client-facing message
    pub message: String,
    /// Offending fields (dotted paths for nested ones)
    pub fields: Vec<String>,
}

impl ValidationError {
    /// Create a validation error
    pub fn new(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            message: message.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Error for a set of missing required fields, naming all of them
    #[must_use]
    pub fn missing(required: &[&str], missing: Vec<String>) -> Self {
        let verb = if required.len() == 1 { "is" } else { "are" };
        Self {
            message: format!("{} {verb} required", join_fields(required)),
            fields: missing,
        }
    }
}

/// `a`, `a and b`, `a, b and c`
fn join_fields(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// JavaScript truthiness of a JSON value
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Fields of one request body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Wrap a request body. Anything but an object carries no fields.
    #[must_use]
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Raw field value, if present at all
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field value if truthy
    #[must_use]
    pub fn truthy(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| is_truthy(v))
    }

    /// Required fields that are missing or falsy, in declaration order
    #[must_use]
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|key| self.truthy(key).is_none())
            .map(|key| (*key).to_string())
            .collect()
    }

    /// Field rendered as text: strings as-is, anything else as JSON.
    /// Absent fields render empty.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(render).unwrap_or_default()
    }

    /// Field rendered as text, or `default` when falsy
    #[must_use]
    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.truthy(key).map_or_else(|| default.to_string(), render)
    }

    /// `options`, or an empty object when falsy
    #[must_use]
    pub fn options(&self) -> Value {
        self.truthy("options").cloned().unwrap_or_else(|| json!({}))
    }

    /// `options` exactly as supplied
    #[must_use]
    pub fn raw_options(&self) -> Option<&Value> {
        self.get("options")
    }

    /// `locales` as a list, or `defaults` when falsy
    #[must_use]
    pub fn locales(&self, defaults: &[&str]) -> Vec<String> {
        match self.truthy("locales") {
            Some(Value::Array(items)) => items.iter().map(render).collect(),
            Some(other) => vec![render(other)],
            None => defaults.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `options.limit` must be a positive number and `options.categories` a
/// subset of [`VALID_CATEGORIES`], when given.
pub fn check_recently_played(params: &Params) -> Result<(), ValidationError> {
    let Some(options) = params.truthy("options") else {
        return Ok(());
    };

    if let Some(limit) = options.get("limit").filter(|v| is_truthy(v)) {
        if !limit.as_f64().is_some_and(|n| n > 0.0) {
            return Err(ValidationError::new(
                "limit must be a positive number",
                ["options.limit"],
            ));
        }
    }

    if let Some(Value::Array(categories)) = options.get("categories") {
        let invalid: Vec<String> = categories
            .iter()
            .filter(|c| !c.as_str().is_some_and(|s| VALID_CATEGORIES.contains(&s)))
            .map(render)
            .collect();

        if !invalid.is_empty() {
            return Err(ValidationError::new(
                format!(
                    "Invalid categories: {}. Valid categories: {}",
                    invalid.join(", "),
                    VALID_CATEGORIES.join(", ")
                ),
                ["options.categories"],
            ));
        }
    }

    Ok(())
}

/// `options.npTitleIds` must be present.
pub fn check_specific_titles(params: &Params) -> Result<(), ValidationError> {
    let has_title_ids = params
        .truthy("options")
        .and_then(|options| options.get("npTitleIds"))
        .is_some_and(is_truthy);

    if has_title_ids {
        Ok(())
    } else {
        Err(ValidationError::new(
            "options with npTitleIds are required",
            ["options.npTitleIds"],
        ))
    }
}
