use serde_json::Value;

/// Headline field of each command, first non-null wins.
const PRIORITY_KEYS: [&str; 6] = [
    "verdict",
    "cointegrated",
    "total_return",
    "current_zscore",
    "sharpe_ratio",
    "hedge_ratio",
];

/// Print just the headline answer of a command.
pub fn print_minimal(value: &Value) {
    println!("{}", headline(value));
}

fn headline(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result_obj else {
        return format_minimal(result_obj);
    };

    if let Some(val) = PRIORITY_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
    {
        return format_minimal(val);
    }

    // Row tables are too long for one line
    match map.iter().find(|(_, v)| !v.is_array()) {
        Some((key, val)) => format!("{}: {}", key, format_minimal(val)),
        None => String::new(),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_verdict_wins_over_other_fields() {
        let v = json!({ "result": { "first": "KO", "verdict": "cointegrated", "total_return": "0.1" } });
        assert_eq!(headline(&v), "cointegrated");
    }

    #[test]
    fn test_null_priority_field_is_skipped() {
        let v = json!({ "result": { "current_zscore": null, "hedge_ratio": "0.8" } });
        assert_eq!(headline(&v), "0.8");
    }

    #[test]
    fn test_fallback_skips_row_arrays() {
        let v = json!({ "result": { "rows": [1, 2], "window": 30 } });
        assert_eq!(headline(&v), "window: 30");
    }
}
