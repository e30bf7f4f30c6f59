use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};

/// Parses a user- or cell-supplied amount.
///
/// Accepts grouping spaces (including non-breaking ones), a comma or dot as
/// the decimal separator, comma grouping when a dot is also present, and the
/// accounting convention of parentheses for negatives: `(1 234,5)` is
/// `-1234.5`. Empty input and the configured absent markers yield `None`.
pub fn parse_amount(text: &str, config: &AnalyticsConfig) -> Result<Option<f64>> {
    if config.is_absent_marker(text) {
        return Ok(None);
    }

    let invalid = |details: &str| AnalyticsError::InvalidInput {
        input: text.to_string(),
        details: details.to_string(),
    };

    let trimmed = text.trim();
    let (negated, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let mut cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.contains('.') {
        cleaned.retain(|c| c != ',');
    } else if cleaned.matches(',').count() == 1 {
        cleaned = cleaned.replace(',', ".");
    }

    if cleaned.is_empty() {
        return Err(invalid("no digits"));
    }

    let value: f64 = cleaned.parse().map_err(|_| invalid("not a number"))?;
    if !value.is_finite() {
        return Err(invalid("value is not finite"));
    }

    Ok(Some(if negated { -value } else { value }))
}

/// Two decimals with comma thousands grouping, e.g. `-1,234,567.89`.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

pub fn format_optional(value: Option<f64>, marker: &str) -> String {
    match value {
        Some(v) => format_amount(v),
        None => marker.to_string(),
    }
}

/// Divides, substituting 0 for a zero denominator.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Option<f64>> {
        parse_amount(text, &AnalyticsConfig::default())
    }

    #[test]
    fn test_parse_plain_and_grouped() {
        assert_eq!(parse("434053").unwrap(), Some(434053.0));
        assert_eq!(parse("434 053").unwrap(), Some(434053.0));
        assert_eq!(parse("434\u{a0}053,50").unwrap(), Some(434053.5));
        assert_eq!(parse("1,234,567.25").unwrap(), Some(1234567.25));
        assert_eq!(parse("-12.5").unwrap(), Some(-12.5));
    }

    #[test]
    fn test_parse_parenthesised_negative() {
        assert_eq!(parse("(1 500)").unwrap(), Some(-1500.0));
    }

    #[test]
    fn test_parse_absent() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("N/A").unwrap(), None);
        assert_eq!(parse(" - ").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("12abc"), Err(AnalyticsError::InvalidInput { .. })));
        assert!(matches!(parse("()"), Err(AnalyticsError::InvalidInput { .. })));
        assert!(matches!(parse("inf"), Err(AnalyticsError::InvalidInput { .. })));
        assert!(matches!(parse("1,2,3"), Err(AnalyticsError::InvalidInput { .. })));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(434053.0), "434,053.00");
        assert_eq!(format_amount(-1234567.891), "-1,234,567.89");
        assert_eq!(format_amount(12.5), "12.50");
        assert_eq!(format_amount(-0.001), "0.00");
        assert_eq!(format_amount(100.0), "100.00");
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(10.0, 4.0), 2.5);
        assert_eq!(safe_div(10.0, 0.0), 0.0);
    }
}
