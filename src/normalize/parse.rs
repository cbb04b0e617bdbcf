// src/normalize/parse.rs

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// `"2017-2018"` → 2017, `"2019"` → 2019. Only the first `-` token counts.
pub fn parse_year(label: &str) -> Option<i32> {
    let cleaned = clean_str(label);
    let first = cleaned.split('-').next()?.trim();
    first.parse::<i32>().ok()
}

/// Strip comma thousands separators and parse. Rejects empty cells and
/// anything that does not land on a finite `f64`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = clean_str(raw).chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `num / den`, or `None` when the quotient would not be a finite number.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    Some(num / den).filter(|r| r.is_finite())
}
