// src/services/number.rs
use thiserror::Error;

/// Text that still is not a number once separators and suffixes are removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed numeric text: {input:?}")]
pub struct ParseNumberError {
    pub input: String,
}

/// Parse a number as it appears on the finance sites.
///
/// Handles thousands separators in either locale (`1,234.56`, `1.234,56`,
/// `1.234.567`) and the `M`/`B` magnitude suffixes (`2M`, `1.5B`).
/// Empty text is zero.
pub fn parse_number(text: &str) -> Result<f64, ParseNumberError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let (digits, multiplier) = if let Some(rest) = trimmed.strip_suffix('M') {
        (rest, 1_000_000.0)
    } else if let Some(rest) = trimmed.strip_suffix('B') {
        (rest, 1_000_000_000.0)
    } else {
        (trimmed, 1.0)
    };

    let normalized = if uses_decimal_comma(digits) {
        digits.replace('.', "").replace(',', ".")
    } else {
        digits.replace(',', "")
    };

    normalized
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value * multiplier)
        .ok_or_else(|| ParseNumberError { input: text.to_string() })
}

fn uses_decimal_comma(digits: &str) -> bool {
    let dots = digits.matches('.').count();
    let commas = digits.matches(',').count();
    if dots >= 2 && commas <= 1 {
        return true;
    }
    // `1.234,56`: a single comma after the last dot is the decimal point
    match (digits.rfind('.'), digits.find(',')) {
        (Some(dot), Some(comma)) => commas == 1 && comma > dot,
        _ => false,
    }
}
