// tests/import_test.rs
use chrono::Duration;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_screener::config::{parse_markets, Market};
use stock_screener::services::cache::{CacheCategory, ExpiringCache};
use stock_screener::services::fetcher::Fetcher;
use stock_screener::services::importer::CompanyImporter;
use stock_screener::services::metrics::{Metric, Metrics};
use stock_screener::services::report::{read_csv, to_rows, write_csv};

const SHARES_SELECTOR: &str = "table.stats td.shares";

fn market(base: &str, tickers: &[&str]) -> Market {
    let config = json!([{
        "output_file": "test.csv",
        "currency": "CAD",
        "company_list": tickers,
        "url_template": format!("{}/financials/{{ticker}}.csv", base),
        "profile_url_template": format!("{}/profile/{{yahoo_ticker}}", base),
        "share_count": {
            "url_template": format!("{}/stats/{{yahoo_ticker}}", base),
            "selector": SHARES_SELECTOR
        }
    }]);
    parse_markets(&config.to_string()).unwrap().remove(0)
}

fn report_csv(name: &str, operating_margin: &str) -> String {
    format!(
        "Growth Profitability and Financial Ratios for {name}
Financials
,2016-12,2017-12,TTM
Revenue CAD Mil,\"1,000\",\"1,100\",\"1,200\"
Net Income CAD Mil,100,110,120
Dividends CAD,0.50,0.55,0.60

Key Ratios -> Profitability
Operating Margin,10.0,11.0,{operating_margin}
Return on Assets %,4.0,4.0,5.0
Return on Equity %,10.0,10.0,12.5

Key Ratios -> Cash Flow
Free Cash Flow/Sales %,8.0,9.0,10.0
"
    )
}

fn profile_html(sector: &str) -> String {
    format!(
        r#"<div class="asset-profile-container"><p>1 Main St</p><p><span>Sector(s)</span>: <span>{}</span></p></div>"#,
        sector
    )
}

fn stats_html(shares: &str) -> String {
    format!(r#"<table class="stats"><tr><td>Shares Outstanding</td><td class="shares">{}</td></tr></table>"#, shares)
}

fn seed(cache: &ExpiringCache, market: &Market, ticker: &str, margin: &str) {
    let ttl = Duration::days(10);
    cache
        .put(
            &CacheCategory::Financials.key(&market.financials_url(ticker)),
            json!(report_csv(&format!("{} Inc", ticker), margin)),
            ttl,
        )
        .unwrap();
    cache
        .put(&CacheCategory::Sector.key(&market.profile_url(ticker)), json!("Energy"), ttl)
        .unwrap();
    cache
        .put(
            &CacheCategory::ShareCount.key(&market.share_count_url(ticker)),
            json!(60_000_000.0),
            ttl,
        )
        .unwrap();
}

#[tokio::test]
async fn test_fully_cached_market_needs_no_network() {
    // nothing listens on the discard port, so any request would fail
    let market = market("http://127.0.0.1:9", &["AAA", "BBB"]);
    let cache = ExpiringCache::in_memory().unwrap();
    seed(&cache, &market, "AAA", "20.0");
    seed(&cache, &market, "BBB", "40.0");

    let fetcher = Fetcher::new().unwrap();
    let mut metrics = Metrics::new();
    let report = CompanyImporter::new(&cache, &fetcher)
        .import_market(&market, &mut metrics)
        .await;

    assert_eq!(report.len(), 2);
    assert_eq!(metrics.network_requests(), 0);
    assert_eq!(metrics.get(Metric::CacheHit), 6);
    assert_eq!(metrics.get(Metric::ProcessedCompanies), 2);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join(&market.output_file);
    let rows = to_rows(&report);
    write_csv(&csv_path, &rows).unwrap();

    let written = read_csv(&csv_path).unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written, rows);
    // BBB has the larger operating margin, so it ranks first
    assert_eq!(written[0].symbol, "BBB");
    assert_eq!(written[0].name, "BBB Inc");
    assert_eq!(written[0].sector, "Energy");
    assert!((written[0].pscore - 1000.0 * 0.4 * 0.1 * 0.05 * 0.125).abs() < 1e-9);
    assert_eq!(written[1].earnings_per_share, 2.0);
    assert_eq!(written[1].revenue_per_share, 20.0);
}

#[tokio::test]
async fn test_failed_ticker_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/financials/AAA.csv"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let market = market(&server.uri(), &["AAA", "BBB"]);
    let cache = ExpiringCache::in_memory().unwrap();
    seed(&cache, &market, "BBB", "15.0");

    let fetcher = Fetcher::new().unwrap();
    let mut metrics = Metrics::new();
    let report = CompanyImporter::new(&cache, &fetcher)
        .import_market(&market, &mut metrics)
        .await;

    assert!(report.get("AAA").is_none());
    assert!(report.get("BBB").is_some());
    assert_eq!(metrics.get(Metric::FailedToProcessCompany), 1);
    assert_eq!(metrics.get(Metric::FailedRequests), 1);
    assert_eq!(metrics.get(Metric::ProcessedCompanies), 1);
}

#[tokio::test]
async fn test_fetched_pages_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/financials/BBD.B.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(report_csv("Bombardier", "5.0")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile/BBD-B"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_html("Industrials")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stats/BBD-B"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stats_html("2.5B")))
        .expect(1)
        .mount(&server)
        .await;

    let market = market(&server.uri(), &["BBD.B"]);
    let cache = ExpiringCache::in_memory().unwrap();
    let fetcher = Fetcher::new().unwrap();
    let importer = CompanyImporter::new(&cache, &fetcher);
    let mut metrics = Metrics::new();

    let first = importer.import_market(&market, &mut metrics).await;
    assert_eq!(metrics.get(Metric::CacheMiss), 3);
    assert_eq!(metrics.get(Metric::SuccessfulRequests), 3);

    let record = first.get("BBD.B").unwrap();
    assert_eq!(record.name, "Bombardier");
    assert_eq!(record.sector, "Industrials");
    assert_eq!(record.share_count, 2_500_000_000.0);
    assert_eq!(record.revenue.currency.as_deref(), Some("CAD"));

    let sector_key = CacheCategory::Sector.key(&market.profile_url("BBD.B"));
    assert_eq!(cache.get(&sector_key, &mut metrics).unwrap(), json!("Industrials"));

    // second pass is served from the cache; the mocks allow one request each
    let second = importer.import_market(&market, &mut metrics).await;
    assert_eq!(second.get("BBD.B"), first.get("BBD.B"));
    assert_eq!(metrics.get(Metric::CacheHit), 3);
    assert_eq!(metrics.get(Metric::SuccessfulRequests), 3);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/AAA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stats_html("75M")))
        .expect(1)
        .mount(&server)
        .await;

    let market = market(&server.uri(), &["AAA"]);
    let cache = ExpiringCache::in_memory().unwrap();
    seed(&cache, &market, "AAA", "10.0");
    let share_key = CacheCategory::ShareCount.key(&market.share_count_url("AAA"));
    cache.put(&share_key, json!(1.0), Duration::seconds(-60)).unwrap();

    let fetcher = Fetcher::new().unwrap();
    let mut metrics = Metrics::new();
    let report = CompanyImporter::new(&cache, &fetcher)
        .import_market(&market, &mut metrics)
        .await;

    assert_eq!(report.get("AAA").unwrap().share_count, 75_000_000.0);
    assert_eq!(metrics.get(Metric::CacheMiss), 1);
    assert_eq!(cache.get(&share_key, &mut metrics).unwrap(), json!(75_000_000.0));
}

#[tokio::test]
async fn test_empty_cached_report_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/financials/AAA.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(report_csv("Refetched", "10.0")))
        .expect(1)
        .mount(&server)
        .await;

    let market = market(&server.uri(), &["AAA"]);
    let cache = ExpiringCache::in_memory().unwrap();
    seed(&cache, &market, "AAA", "10.0");
    let report_key = CacheCategory::Financials.key(&market.financials_url("AAA"));
    cache.put(&report_key, json!(""), Duration::days(10)).unwrap();

    let fetcher = Fetcher::new().unwrap();
    let mut metrics = Metrics::new();
    let report = CompanyImporter::new(&cache, &fetcher)
        .import_market(&market, &mut metrics)
        .await;

    assert_eq!(report.get("AAA").unwrap().name, "Refetched");
    assert_eq!(metrics.get(Metric::CorruptedCache), 1);
}

#[tokio::test]
async fn test_zero_share_count_fails_the_company() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/AAA"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stats_html("0")))
        .mount(&server)
        .await;

    let market = market(&server.uri(), &["AAA", "BBB"]);
    let cache = ExpiringCache::in_memory().unwrap();
    seed(&cache, &market, "AAA", "10.0");
    seed(&cache, &market, "BBB", "10.0");
    let share_key = CacheCategory::ShareCount.key(&market.share_count_url("AAA"));
    cache.put(&share_key, json!(1.0), Duration::zero()).unwrap();

    let fetcher = Fetcher::new().unwrap();
    let mut metrics = Metrics::new();
    let report = CompanyImporter::new(&cache, &fetcher)
        .import_market(&market, &mut metrics)
        .await;

    assert_eq!(report.len(), 1);
    assert_eq!(report.companies[0].symbol, "BBB");
    assert_eq!(metrics.get(Metric::FailedToProcessCompany), 1);
    // the invalid value is not cached
    assert!(!cache.contains(&share_key, &mut metrics).unwrap());
}
