// src/bin/fix_cache.rs
// Rewrites every legacy entry reachable from the configured markets into the
// {content, expiry} shape. Run with: cargo run --bin fix_cache
use dotenv::dotenv;
use env_logger;
use log::{error, info};

use stock_screener::config::{load_markets, AppConfig};
use stock_screener::services::cache::ExpiringCache;
use stock_screener::services::importer::fix_company_entries;
use stock_screener::services::metrics::{Metric, Metrics};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let markets = load_markets(config.markets_path.as_deref())?;
    let cache = ExpiringCache::open(&config.cache_path)?;
    info!("Fixing cache entries in {}", config.cache_path.display());

    let mut metrics = Metrics::new();
    for market in &markets {
        for ticker in &market.company_list {
            match fix_company_entries(&cache, market, ticker, &mut metrics) {
                Ok(()) => metrics.incr(Metric::ProcessedCompanies),
                Err(e) => {
                    error!("Failed to process company {}: {}", ticker, e);
                    metrics.incr(Metric::FailedToProcessCompany);
                }
            }
        }
    }

    cache.close()?;
    println!("{}", metrics);
    Ok(())
}
