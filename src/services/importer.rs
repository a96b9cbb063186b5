// src/services/importer.rs
use log::{debug, error, info, warn};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Market;
use crate::error::Result;
use crate::models::{CompanyRecord, MarketReport};
use crate::services::cache::{CacheCategory, ExpiringCache};
use crate::services::fetcher::Fetcher;
use crate::services::financials::parse_report;
use crate::services::metrics::{Metric, Metrics};
use crate::services::profile::ProfileScraper;
use crate::services::share_count::extract_share_count;

fn is_blank(content: &Value) -> bool {
    match content {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Rewrite the legacy cache records of one ticker into canonical shape.
///
/// Records that were already canonical are counted as `CopiedEntry`.
pub fn fix_company_entries(
    cache: &ExpiringCache,
    market: &Market,
    ticker: &str,
    metrics: &mut Metrics,
) -> Result<()> {
    let keys = [
        CacheCategory::Financials.key(&market.financials_url(ticker)),
        CacheCategory::ShareCount.key(&market.share_count_url(ticker)),
        CacheCategory::Sector.key(&market.profile_url(ticker)),
    ];
    for key in &keys {
        if cache.migrate(key, metrics)? == Some(false) {
            metrics.incr(Metric::CopiedEntry);
        }
    }
    Ok(())
}

/// Walks a market one ticker at a time, going through the cache before the network.
pub struct CompanyImporter<'a> {
    cache: &'a ExpiringCache,
    fetcher: &'a Fetcher,
    profile: ProfileScraper,
}

impl<'a> CompanyImporter<'a> {
    pub fn new(cache: &'a ExpiringCache, fetcher: &'a Fetcher) -> Self {
        CompanyImporter {
            cache,
            fetcher,
            profile: ProfileScraper::default(),
        }
    }

    /// Cached value for `url` in `category`, or fetch the page, extract and cache the value.
    async fn resolve<T, F>(
        &self,
        category: CacheCategory,
        url: &str,
        metrics: &mut Metrics,
        extract: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&str) -> Result<T>,
    {
        let key = category.key(url);
        if self.cache.contains(&key, metrics)? {
            metrics.incr(Metric::CacheHit);
            let content = self.cache.get(&key, metrics)?;
            if !is_blank(&content) {
                debug!("Cache hit for {}", key);
                return Ok(serde_json::from_value(content)?);
            }
            metrics.incr(Metric::CorruptedCache);
            debug!("Cached entry for {} is empty, refetching", key);
        } else {
            metrics.incr(Metric::CacheMiss);
        }

        let body = self.fetcher.fetch(url, &HeaderMap::new(), metrics).await?;
        let value = extract(&body)?;
        self.cache
            .put(&key, serde_json::to_value(&value)?, category.random_ttl())?;
        Ok(value)
    }

    pub async fn import_company(
        &self,
        market: &Market,
        ticker: &str,
        metrics: &mut Metrics,
    ) -> Result<CompanyRecord> {
        let report: String = self
            .resolve(
                CacheCategory::Financials,
                &market.financials_url(ticker),
                metrics,
                |body| Ok(body.to_string()),
            )
            .await?;
        let mut record = parse_report(&report)?;
        record.symbol = ticker.to_string();
        if let Some(currency) = market.foreign_currency(&record) {
            warn!(
                "{} reports in {} but {} is configured for {}",
                ticker, currency, market.output_file, market.currency
            );
        }

        record.sector = self
            .resolve(
                CacheCategory::Sector,
                &market.profile_url(ticker),
                metrics,
                |html| self.profile.extract_sector(html),
            )
            .await?;

        record.share_count = self
            .resolve(
                CacheCategory::ShareCount,
                &market.share_count_url(ticker),
                metrics,
                |html| extract_share_count(html, &market.share_count.selector),
            )
            .await?;

        Ok(record)
    }

    /// Import every ticker of `market`. A failing ticker is logged, counted and left out.
    pub async fn import_market(&self, market: &Market, metrics: &mut Metrics) -> MarketReport {
        info!(
            "Importing {} companies for {}",
            market.company_list.len(),
            market.output_file
        );

        let mut report = MarketReport::default();
        for ticker in &market.company_list {
            match self.import_company(market, ticker, metrics).await {
                Ok(record) => {
                    metrics.incr(Metric::ProcessedCompanies);
                    report.companies.push(record);
                }
                Err(e) => {
                    error!("Failed to process company {}: {}", ticker, e);
                    metrics.incr(Metric::FailedToProcessCompany);
                }
            }
        }

        info!(
            "Imported {} of {} companies for {}",
            report.len(),
            market.company_list.len(),
            market.output_file
        );
        report
    }
}
