//! Canonical field names from free-form spreadsheet text

use crate::records::value::Value;
use regex::Regex;
use std::sync::LazyLock;

static IS_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^is(\P{L}|$)").expect("Hardcode regex pattern"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("Hardcode regex pattern"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").expect("Hardcode regex pattern"));
static CAMEL_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("Hardcode regex pattern"));
static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Hardcode regex pattern"));

/// Converts header text to a lowercase, underscore separated identifier.
///
/// A trailing `?` turns the name into a predicate (`Paid?` becomes
/// `is_paid`), `/` reads as `per` and `%` as `pct`. Returns `None` when
/// nothing is left.
pub fn normalize_name(raw: &str) -> Option<String> {
    let mut name = raw.trim().to_lowercase();
    if let Some(stripped) = name.strip_suffix('?') {
        name = if IS_PREFIX.is_match(stripped) {
            stripped.to_owned()
        } else {
            format!("is_{}", stripped)
        };
    }
    let name = name.replace('/', "_per_").replace('%', "_pct_");
    let name = NON_WORD.replace_all(&name, "_");
    let name = UNDERSCORES.replace_all(&name, "_");
    let name = name.trim_matches('_');
    (!name.is_empty()).then(|| name.to_owned())
}

/// Normalizes a cell value as a name; `Null` and empty names give `Null`.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Text(text) => normalize_name(text).into(),
        _ => normalize_name(&value.to_string()).into(),
    }
}

/// `getHTTPResponseCode` to `get_http_response_code`.
pub fn camel_to_snake(name: &str) -> String {
    let name = CAMEL_WORD.replace_all(name, "${1}_${2}");
    CAMEL_BOUNDARY.replace_all(&name, "${1}_${2}").to_lowercase()
}
