// src/services/profile.rs
use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScreenerError};

/// One way of finding the sector on a profile page.
pub trait SectorStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, document: &Html) -> Option<String>;
}

/// Text of the first element matching a CSS selector.
pub struct SelectorText {
    pub name: &'static str,
    pub selector: &'static str,
}

impl SectorStrategy for SelectorText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse(self.selector).ok()?;
        document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    }
}

/// The element right after a label such as `Sector(s):`.
pub struct LabelledValue {
    pub labels: &'static [&'static str],
}

impl SectorStrategy for LabelledValue {
    fn name(&self) -> &'static str {
        "labelled value"
    }

    fn extract(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("span, dt, th").ok()?;
        document
            .select(&selector)
            .filter(|el| {
                let text = el.text().collect::<String>();
                let label = text.trim().trim_end_matches(':').trim();
                self.labels.contains(&label)
            })
            .filter_map(|el| el.next_siblings().find_map(ElementRef::wrap))
            .map(|value| value.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    }
}

/// Ordered fallback chain over the profile layouts seen so far.
pub struct ProfileScraper {
    strategies: Vec<Box<dyn SectorStrategy>>,
}

impl Default for ProfileScraper {
    fn default() -> Self {
        ProfileScraper {
            strategies: vec![
                Box::new(SelectorText {
                    name: "asset profile container",
                    selector: "div.asset-profile-container p:nth-of-type(2) > span:nth-of-type(2)",
                }),
                Box::new(SelectorText {
                    name: "asset profile section",
                    selector: "section[data-testid=\"asset-profile\"] dl > div:first-child a",
                }),
                Box::new(LabelledValue {
                    labels: &["Sector", "Sector(s)"],
                }),
            ],
        }
    }
}

impl ProfileScraper {
    pub fn new(strategies: Vec<Box<dyn SectorStrategy>>) -> Self {
        ProfileScraper { strategies }
    }

    pub fn extract_sector(&self, html: &str) -> Result<String> {
        let document = Html::parse_document(html);
        for strategy in &self.strategies {
            if let Some(sector) = strategy.extract(&document) {
                debug!("Sector found by {}: {}", strategy.name(), sector);
                return Ok(sector);
            }
        }
        Err(ScreenerError::SectorNotFound)
    }
}

pub fn extract_sector(html: &str) -> Result<String> {
    ProfileScraper::default().extract_sector(html)
}
