//! Display-level defaults for absent data. Missing fields never raise;
//! they render as a fixed placeholder.

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

/// Render an optional text field, falling back to `"Unknown"`.
pub fn or_unknown(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN,
    }
}

/// Render an optional numeric field, falling back to `"N/A"`.
pub fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
