// src/config.rs
use log::{info, warn};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScreenerError};
use crate::models::CompanyRecord;
use crate::services::share_count::parse_selector;

const BUILTIN_MARKETS: &str = include_str!("../config/markets.json");

/// Settings read from the environment (and `.env`, once `dotenv` has run).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub cache_path: PathBuf,
    pub markets_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let cache_path = env::var("SCREENER_CACHE_PATH").unwrap_or_else(|_| {
            warn!("SCREENER_CACHE_PATH not set, defaulting to screener_cache.sqlite3");
            "screener_cache.sqlite3".to_string()
        });
        let markets_path = env::var("SCREENER_MARKETS").ok().map(PathBuf::from);
        let output_dir = env::var("SCREENER_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string());

        AppConfig {
            cache_path: PathBuf::from(cache_path),
            markets_path,
            output_dir: PathBuf::from(output_dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShareCountSource {
    pub url_template: String,
    pub selector: String,
}

/// One exchange: its tickers and where to find each kind of page for them.
///
/// Templates take `{ticker}` as-is or `{yahoo_ticker}` with dots turned into dashes.
#[derive(Debug, Clone)]
pub struct Market {
    pub output_file: String,
    pub currency: String,
    pub company_list: Vec<String>,
    pub url_template: String,
    pub profile_url_template: String,
    pub share_count: ShareCountSource,
}

fn render(template: &str, ticker: &str) -> String {
    template
        .replace("{ticker}", ticker)
        .replace("{yahoo_ticker}", &ticker.replace('.', "-"))
}

impl Market {
    pub fn financials_url(&self, ticker: &str) -> String {
        render(&self.url_template, ticker)
    }

    pub fn profile_url(&self, ticker: &str) -> String {
        render(&self.profile_url_template, ticker)
    }

    pub fn share_count_url(&self, ticker: &str) -> String {
        render(&self.share_count.url_template, ticker)
    }

    /// First currency code in `record` that differs from the market's own.
    pub fn foreign_currency<'r>(&self, record: &'r CompanyRecord) -> Option<&'r str> {
        [
            &record.revenue,
            &record.net_income,
            &record.earnings_per_share,
            &record.book_value_per_share,
            &record.dividends_per_share,
        ]
        .into_iter()
        .filter_map(|money| money.currency.as_deref())
        .find(|currency| *currency != self.currency)
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |node, key| node.get(key))
}

fn required_str(value: &Value, market: usize, path: &str) -> Result<String> {
    lookup(value, path)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ScreenerError::MissingConfigKey { market, key: path.to_string() })
}

fn required_template(value: &Value, market: usize, path: &str) -> Result<String> {
    let template = required_str(value, market, path)?;
    if !template.contains("{ticker}") && !template.contains("{yahoo_ticker}") {
        return Err(ScreenerError::Config(format!(
            "market {}: `{}` has no {{ticker}} placeholder",
            market, path
        )));
    }
    Ok(template)
}

fn market_from_value(value: &Value, index: usize) -> Result<Market> {
    let output_file = required_str(value, index, "output_file")?;
    let currency = required_str(value, index, "currency")?;

    let company_list = lookup(value, "company_list")
        .and_then(Value::as_array)
        .ok_or_else(|| ScreenerError::MissingConfigKey {
            market: index,
            key: "company_list".to_string(),
        })?
        .iter()
        .map(|ticker| {
            ticker.as_str().map(str::to_string).ok_or_else(|| {
                ScreenerError::Config(format!("market {}: ticker {} is not a string", index, ticker))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let url_template = required_template(value, index, "url_template")?;
    let profile_url_template = required_template(value, index, "profile_url_template")?;
    let share_count = ShareCountSource {
        url_template: required_template(value, index, "share_count.url_template")?,
        selector: required_str(value, index, "share_count.selector")?,
    };
    parse_selector(&share_count.selector)?;

    Ok(Market {
        output_file,
        currency,
        company_list,
        url_template,
        profile_url_template,
        share_count,
    })
}

/// Parse and validate every market before any of them is processed.
pub fn parse_markets(json: &str) -> Result<Vec<Market>> {
    let value: Value = serde_json::from_str(json)?;
    let entries = value
        .as_array()
        .ok_or_else(|| ScreenerError::Config("market configuration must be a JSON array".into()))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| market_from_value(entry, index))
        .collect()
}

pub fn load_markets(path: Option<&Path>) -> Result<Vec<Market>> {
    match path {
        Some(path) => {
            info!("Loading markets from {}", path.display());
            parse_markets(&std::fs::read_to_string(path)?)
        }
        None => parse_markets(BUILTIN_MARKETS),
    }
}
