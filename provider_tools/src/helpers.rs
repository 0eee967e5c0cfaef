use serde_json::Value;
use smm_common::{remote::RemoteApiError, Money};

/// SMM panels are inconsistent about quoting numbers, so accept `"157"` as well as `157`.
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn lenient_money(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_json(body: &str) -> Result<Value, RemoteApiError> {
    serde_json::from_str(body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        RemoteApiError::InvalidResponse(format!("{e}. Response was: {preview}"))
    })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_i64(&json!("3572")), Some(3572));
        assert_eq!(lenient_i64(&json!(157)), Some(157));
        assert_eq!(lenient_i64(&json!(null)), None);
        assert_eq!(lenient_money(&json!("0.27819")), Some(Money::from_micros(278_190)));
        assert_eq!(lenient_money(&json!(100.84292)), Some(Money::from_micros(100_842_920)));
        assert_eq!(lenient_string(&json!(23501)), Some("23501".to_string()));
    }

    #[test]
    fn garbage_is_an_invalid_response() {
        assert!(matches!(parse_json("<html>502</html>"), Err(RemoteApiError::InvalidResponse(_))));
    }
}
