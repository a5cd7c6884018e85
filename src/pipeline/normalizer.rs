//! Amount normalization from free-text disclosure values to integer millions

/// Parse a free-text amount into a number.
///
/// Strips every character that is not an ASCII digit or a decimal point,
/// keeping a minus sign only in leading position, then parses the rest.
/// Handles the formats the upstream source actually emits: "1,234",
/// "$-55.6", "  912 ".
///
/// Returns `None` (never zero) for empty strings, the literal "null", and
/// anything that fails to parse.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }

    let mut cleaned = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_digit() || c == '.' {
            cleaned.push(c);
        } else if c == '-' && cleaned.is_empty() {
            cleaned.push(c);
        }
    }

    cleaned.parse::<f64>().ok()
}

/// Round a parsed amount to the nearest integer million.
///
/// Stored values carry no sub-unit precision.
pub fn to_millions(value: f64) -> i64 {
    value.round() as i64
}

/// Normalize a raw textual amount to a stored integer-millions value.
pub fn normalize_amount(raw: &str) -> Option<i64> {
    parse_amount(raw).map(to_millions)
}
