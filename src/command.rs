//! The single-string command form.
//!
//! The human-input tool (and any client that prefers it) can issue
//! `"RotateLook, rotation=45, horizon=15"` instead of a typed call. This is
//! a parsing convenience layered in front of the typed step surface, not part
//! of parameter normalization.

use serde_json::Value;
use tracing::warn;

use crate::params::ParamMap;

/// Split a comma-separated command line into an action name and a parameter
/// map.
///
/// Values are coerced to floats when they parse as one, and kept as strings
/// otherwise. Malformed `key=value` pairs are skipped with a warning.
pub fn parse(input: &str) -> (String, ParamMap) {
    let mut parts = input.split(',');
    let action = parts.next().unwrap_or("").trim().to_string();

    let mut params = ParamMap::new();
    for part in parts {
        let Some((key, value)) = part.split_once('=') else {
            warn!(part = part.trim(), "ignoring parameter without '='");
            continue;
        };
        params.insert(key.trim().to_string(), coerce(value.trim()));
    }

    (action, params)
}

fn coerce(value: &str) -> Value {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Value::from(number),
        _ => Value::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_action_and_float_coerced_params() {
        let (action, params) = parse("RotateLook, rotation=45, horizon=15");
        assert_eq!(action, "RotateLook");
        assert_eq!(params["rotation"], json!(45.0));
        assert_eq!(params["horizon"], json!(15.0));
    }

    #[test]
    fn keeps_non_numeric_values_as_strings() {
        let (action, params) = parse("PickupObject, objectId=ball_1");
        assert_eq!(action, "PickupObject");
        assert_eq!(params["objectId"], json!("ball_1"));
    }

    #[test]
    fn bare_action_has_no_params() {
        let (action, params) = parse("MoveAhead");
        assert_eq!(action, "MoveAhead");
        assert!(params.is_empty());
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let (action, params) = parse("MoveAhead, amount");
        assert_eq!(action, "MoveAhead");
        assert!(params.is_empty());
    }

    #[test]
    fn whitespace_is_trimmed_everywhere() {
        let (action, params) = parse("  ThrowObject ,  force = 0.25 ");
        assert_eq!(action, "ThrowObject");
        assert_eq!(params["force"], json!(0.25));
    }
}
