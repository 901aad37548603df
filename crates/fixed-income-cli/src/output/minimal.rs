use serde_json::Value;

/// Headline field per command, checked in order; the first non-null wins.
const HEADLINE_KEYS: [&str; 14] = [
    "clean_price",
    "yield_to_maturity",
    "modified_duration",
    "z_spread",
    "mark_to_market",
    "bilateral_cva",
    "unilateral_cva",
    "year_fraction",
    "rmse",
    "rate",
    "default_probability",
    "breakeven_spread_bps",
    "points",
    "cumulative",
];

/// Print just the key answer of a command.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    println!("{}", headline(result));
}

fn headline(result: &Value) -> String {
    let Value::Object(map) = result else {
        return format_minimal(result);
    };
    if let Some(val) = HEADLINE_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
    {
        return format_minimal(val);
    }
    match map.iter().next() {
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
    use serde_json::json;

    #[test]
    fn test_headline_prefers_priority_keys() {
        let priced = json!({ "accrued_interest": "0", "clean_price": "1022.17" });
        assert_eq!(headline(&priced), "1022.17");

        let cva = json!({ "unilateral_cva": "10", "bilateral_cva": null });
        assert_eq!(headline(&cva), "10");
    }

    #[test]
    fn test_headline_falls_back_to_first_field() {
        assert_eq!(headline(&json!({ "alpha": 1 })), "alpha: 1");
        assert_eq!(headline(&json!("1.5")), "1.5");
    }
}
