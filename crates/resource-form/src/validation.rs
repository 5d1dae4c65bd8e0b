//! Validator types, the error payload attached to controls and a set of
//! built-in validators.
//!
//! A validator inspects the current value of a control and returns [`None`]
//! when the value is acceptable, or a [`ValidationErrors`] payload otherwise.
//! Payloads are plain JSON objects keyed by the name of the failed check, for
//! example `{"required": true}` or `{"min": {"min": 0, "actual": -1}}`.
//! Validation failures are data, never Rust errors.
use std::{collections::HashSet, sync::LazyLock};

use const_format::concatcp;
use futures::future::LocalBoxFuture;
use regex::Regex;
use serde_json::{Map, Value, json};

/// Error payload of a single control, keyed by the name of the failed check.
pub type ValidationErrors = Map<String, Value>;

/// A synchronous validator.
pub type Validator = Box<dyn Fn(&Value) -> Option<ValidationErrors>>;

/// An asynchronous validator. The returned future must not borrow the value.
pub type AsyncValidator = Box<dyn Fn(&Value) -> LocalBoxFuture<'static, Option<ValidationErrors>>>;

/// Minimal length required by RFC 1123 is 63.
const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character";

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concatcp!("^", RFC_1123_LABEL_FMT, "$"))
        .expect("failed to compile RFC 1123 label regex")
});

/// Builds a payload with the single entry `key: payload`.
pub fn error(key: impl Into<String>, payload: Value) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.insert(key.into(), payload);
    errors
}

/// Merges `other` into `target`. Entries of `other` win on conflicting keys.
pub fn merge_errors(target: &mut Option<ValidationErrors>, other: Option<ValidationErrors>) {
    match (target.as_mut(), other) {
        (Some(target), Some(other)) => target.extend(other),
        (None, Some(other)) => *target = Some(other),
        (_, None) => {}
    }
}

/// Runs every validator against `value` and merges their payloads.
pub fn run_all(validators: &[Validator], value: &Value) -> Option<ValidationErrors> {
    validators.iter().fold(None, |mut errors, validator| {
        merge_errors(&mut errors, validator(value));
        errors
    })
}

/// Values which count as "not filled in": `null`, the empty string and the
/// empty array.
pub fn is_empty_input(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Fails with `{"required": true}` on empty input.
pub fn required() -> Validator {
    Box::new(|value| is_empty_input(value).then(|| error("required", Value::Bool(true))))
}

/// Fails with `{"pattern": {"requiredPattern", "actualValue"}}` when a string
/// or number does not match `regex`. The regex is anchored to the whole value.
pub fn pattern(regex: &str) -> Result<Validator, regex::Error> {
    let required_pattern = format!("^(?:{regex})$");
    let compiled = Regex::new(&required_pattern)?;

    Ok(Box::new(move |value| {
        let text = match value {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        (!compiled.is_match(&text)).then(|| {
            error(
                "pattern",
                json!({ "requiredPattern": required_pattern, "actualValue": value }),
            )
        })
    }))
}

/// Fails with `{"min": {"min", "actual"}}` when a number (or numeric string) is
/// below `min`. Empty and non-numeric input is accepted.
pub fn min(min: f64) -> Validator {
    Box::new(move |value| {
        let actual = as_number(value)?;
        (actual < min).then(|| error("min", json!({ "min": min, "actual": value })))
    })
}

/// Fails with `{"max": {"max", "actual"}}` when a number (or numeric string) is
/// above `max`.
pub fn max(max: f64) -> Validator {
    Box::new(move |value| {
        let actual = as_number(value)?;
        (actual > max).then(|| error("max", json!({ "max": max, "actual": value })))
    })
}

/// Fails with `{"minlength": {"requiredLength", "actualLength"}}` when a
/// non-empty string or array is shorter than `min_length`.
pub fn min_length(min_length: usize) -> Validator {
    Box::new(move |value| {
        let length = length_of(value)?;
        (length > 0 && length < min_length).then(|| {
            error(
                "minlength",
                json!({ "requiredLength": min_length, "actualLength": length }),
            )
        })
    })
}

/// Fails with `{"maxlength": {"requiredLength", "actualLength"}}` when a string
/// or array is longer than `max_length`.
pub fn max_length(max_length: usize) -> Validator {
    Box::new(move |value| {
        let length = length_of(value)?;
        (length > max_length).then(|| {
            error(
                "maxlength",
                json!({ "requiredLength": max_length, "actualLength": length }),
            )
        })
    })
}

/// Fails with `{"rfc1123Label": {"message", "actualValue"}}` when a non-empty
/// string is not a lowercase RFC 1123 label, which is what Kubernetes requires
/// for most object and container names.
pub fn rfc1123_label() -> Validator {
    Box::new(|value| {
        let text = value.as_str().filter(|s| !s.is_empty())?;
        let valid = text.len() <= RFC_1123_LABEL_MAX_LENGTH && RFC_1123_LABEL_REGEX.is_match(text);

        (!valid).then(|| {
            error(
                "rfc1123Label",
                json!({
                    "message": RFC_1123_LABEL_ERROR_MSG,
                    "maxLength": RFC_1123_LABEL_MAX_LENGTH,
                    "actualValue": text,
                }),
            )
        })
    })
}

/// Fails with `{error_key: true}` when two items of an array share the same key
/// as extracted by `key_of`. Empty keys count too, and items without a key
/// have the key `null`.
pub fn unique_by<F>(error_key: &'static str, key_of: F) -> Validator
where
    F: Fn(&Value) -> Option<&Value> + 'static,
{
    Box::new(move |value| {
        let items = value.as_array()?;
        let mut seen = HashSet::new();

        let has_duplicate = items
            .iter()
            .map(|item| key_of(item).unwrap_or(&Value::Null))
            .any(|key| !seen.insert(key.to_string()));

        has_duplicate.then(|| error(error_key, Value::Bool(true)))
    })
}

/// Duplicate check for arrays of `[key, value]` rows, failing with
/// `{"duplicateKey": true}`.
pub fn duplicate_key() -> Validator {
    unique_by("duplicateKey", |row| row.get(0))
}

/// Row check for a `[key, value]` pair, failing with `{"keyIsMissing": true}`
/// when the value is filled in but the key is not.
pub fn key_is_missing() -> Validator {
    Box::new(|row| {
        let key = row.get(0).unwrap_or(&Value::Null);
        let value = row.get(1).unwrap_or(&Value::Null);

        (is_empty_input(key) && !is_empty_input(value))
            .then(|| error("keyIsMissing", Value::Bool(true)))
    })
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}
