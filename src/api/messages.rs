use serde_json::Value;

/// Pulls a human readable message out of an ERPNext error body.
///
/// `_server_messages` is a JSON string holding an array whose elements are
/// themselves JSON strings, e.g. `"[\"{\\\"message\\\": \\\"Item exists\\\"}\"]"`.
/// The first element's `message` wins; anything unparsable falls back to
/// `default`.
pub fn parse_server_messages(raw: Option<&Value>, default: &str) -> String {
    raw.and_then(first_server_message)
        .unwrap_or_else(|| default.to_string())
}

fn first_server_message(raw: &Value) -> Option<String> {
    let outer: Vec<Value> = match raw {
        Value::String(s) => serde_json::from_str(s).ok()?,
        Value::Array(items) => items.clone(),
        _ => return None,
    };
    let first = match outer.into_iter().next()? {
        Value::String(inner) => serde_json::from_str::<Value>(&inner).ok()?,
        other => other,
    };
    first
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Message for a failed list call: `_server_messages`, then a string
/// `message` or `exc` field, then `default`.
pub fn list_error_message(body: &Value, default: &str) -> String {
    let fallback = ["message", "exc"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .unwrap_or(default);
    parse_server_messages(body.get("_server_messages"), fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_nested_message_wins() {
        let inner = json!({ "message": "Item Code already exists" }).to_string();
        let second = json!({ "message": "ignored" }).to_string();
        let outer = serde_json::to_string(&vec![inner, second]).unwrap();
        let raw = Value::String(outer);
        assert_eq!(
            parse_server_messages(Some(&raw), "fallback"),
            "Item Code already exists"
        );
    }

    #[test]
    fn garbage_falls_back() {
        let raw = Value::String("not json".into());
        assert_eq!(parse_server_messages(Some(&raw), "fallback"), "fallback");
        assert_eq!(parse_server_messages(None, "fallback"), "fallback");
        let empty = Value::String("[]".into());
        assert_eq!(parse_server_messages(Some(&empty), "fallback"), "fallback");
    }

    #[test]
    fn list_errors_use_message_then_exc() {
        let body = json!({ "exc": "frappe.exceptions.PermissionError" });
        assert_eq!(
            list_error_message(&body, "Failed to fetch items from ERPNext"),
            "frappe.exceptions.PermissionError"
        );
        let body = json!({ "message": "Not permitted", "exc": "trace" });
        assert_eq!(list_error_message(&body, "x"), "Not permitted");
        assert_eq!(list_error_message(&json!({}), "x"), "x");
    }
}
