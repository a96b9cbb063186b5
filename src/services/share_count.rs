// src/services/share_count.rs
use scraper::{Html, Selector};

use crate::error::{Result, ScreenerError};
use crate::services::number::parse_number;

const NOT_AVAILABLE: &str = "N/A";

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScreenerError::Selector(format!("{} ({:?})", selector, e)))
}

/// Shares outstanding from a statistics page, located by the market's selector.
pub fn extract_share_count(html: &str, selector: &str) -> Result<f64> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    let text = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty() && text != NOT_AVAILABLE)
        .ok_or(ScreenerError::ShareCountNotFound)?;

    let count = parse_number(&text)?;
    if count == 0.0 {
        return Err(ScreenerError::InvalidShareCount);
    }
    Ok(count)
}
