use anyhow::Result;
use dotenv::dotenv;
use env_logger;
use log::{error, info};

use stock_screener::config::{load_markets, AppConfig};
use stock_screener::services::cache::ExpiringCache;
use stock_screener::services::fetcher::Fetcher;
use stock_screener::services::importer::CompanyImporter;
use stock_screener::services::metrics::Metrics;
use stock_screener::services::report::{print_table, to_rows, write_csv};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the screener...");

    let config = AppConfig::from_env();
    // Every market is validated before the first request goes out
    let markets = load_markets(config.markets_path.as_deref())?;
    info!("Loaded {} market(s)", markets.len());

    let cache = ExpiringCache::open(&config.cache_path)?;
    info!("Using cache at {}", config.cache_path.display());
    let fetcher = Fetcher::new()?;
    let mut metrics = Metrics::new();

    {
        let importer = CompanyImporter::new(&cache, &fetcher);
        for market in &markets {
            let report = importer.import_market(market, &mut metrics).await;
            let rows = to_rows(&report);

            let path = config.output_dir.join(&market.output_file);
            if let Err(e) = write_csv(&path, &rows) {
                error!("Failed to write {}: {}", path.display(), e);
            }
            print_table(&rows);
        }
    }

    if let Err(e) = cache.close() {
        error!("Failed to close cache: {}", e);
    }
    println!("{}", metrics);
    Ok(())
}
