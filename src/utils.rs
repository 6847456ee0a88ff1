/// Utility functions
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Render a loosely typed table cell.
///
/// Null, empty or zero cells become `N/A`; a comma-separated cell whose parts
/// are all equal (one value per telescope) collapses to that value.
pub fn display_cell(v: &Value) -> String {
    match v {
        Value::String(s) if s.contains(',') => {
            let parts: Vec<&str> = s.split(',').collect();
            if parts.iter().all(|p| *p == parts[0]) {
                parts[0].to_string()
            } else {
                s.clone()
            }
        }
        other => cell_or_na(other),
    }
}

/// A cell as sent, with `N/A` for null, empty, zero or false
pub fn cell_or_na(v: &Value) -> String {
    if is_blank(v) {
        "N/A".to_string()
    } else {
        cell_text(v)
    }
}

/// A cell as sent; null renders as nothing
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Parse a backend timestamp. Naive ISO-8601 text is taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

pub fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| de::Error::custom(format!("bad timestamp: {}", s)))
}

pub fn de_timestamps<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| parse_timestamp(s).ok_or_else(|| de::Error::custom(format!("bad timestamp: {}", s))))
        .collect()
}

/// Accept either a JSON string or a number and keep it as text
pub fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected text or number, got {}", other))),
    }
}

/// Normalise a typed exposure: strip leading zeros, keep a single zero before a
/// bare fraction (`007` -> `7`, `00.5` -> `0.5`, `.5` -> `0.5`).
pub fn normalize_exposure_text(s: &str) -> String {
    let trimmed = s.trim();
    let without_zeros = trimmed.trim_start_matches('0');
    if without_zeros.is_empty() {
        return if trimmed.is_empty() { String::new() } else { "0".to_string() };
    }
    if without_zeros.starts_with('.') {
        format!("0{}", without_zeros)
    } else {
        without_zeros.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_display_cell_collapses_identical_parts() {
        assert_eq!(display_cell(&serde_json::json!("100,100,100")), "100");
        assert_eq!(display_cell(&serde_json::json!("100,120")), "100,120");
    }

    #[test]
    fn test_display_cell_empty_is_na() {
        assert_eq!(display_cell(&Value::Null), "N/A");
        assert_eq!(display_cell(&serde_json::json!("")), "N/A");
        assert_eq!(display_cell(&serde_json::json!(3)), "3");
        assert_eq!(display_cell(&serde_json::json!(0)), "N/A");
    }

    #[test]
    fn test_plain_cells_are_not_collapsed() {
        assert_eq!(cell_or_na(&serde_json::json!("Deep,Deep")), "Deep,Deep");
        assert_eq!(cell_or_na(&serde_json::json!(10)), "10");
        assert_eq!(cell_or_na(&Value::Null), "N/A");
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&serde_json::json!("")), "");
        assert_eq!(cell_text(&serde_json::json!(83.8)), "83.8");
    }

    #[test]
    fn test_parse_timestamp_naive_python_isoformat() {
        let dt = parse_timestamp("2024-01-15T10:30:00.123456").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_normalize_exposure_text() {
        assert_eq!(normalize_exposure_text("0300"), "300");
        assert_eq!(normalize_exposure_text("00.5"), "0.5");
        assert_eq!(normalize_exposure_text(".5"), "0.5");
        assert_eq!(normalize_exposure_text("000"), "0");
        assert_eq!(normalize_exposure_text("120.0"), "120.0");
    }
}
