// src/services/financials.rs
//
// Reader for the "key ratios" CSV export: a title line, then blocks of rows
// introduced by a section label, each data row ending with the TTM column.
use csv::ReaderBuilder;
use regex::Regex;
use once_cell::sync::Lazy;

use crate::error::Result;
use crate::models::{CompanyRecord, Money};
use crate::services::number::parse_number;

const NAME_PREFIX: &str = "Growth Profitability and Financial Ratios for ";
const REVENUE_SECTION: &str = "Revenue %";
const NET_INCOME_SECTION: &str = "Net Income %";

static DIVIDENDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Dividends(?: ([A-Z]{3}))?$").unwrap());
static BOOK_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Book Value Per Share \*(?: ([A-Z]{3}))?$").unwrap());
static EARNINGS_PER_SHARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Earnings Per Share(?: ([A-Z]{3}))?$").unwrap());
static NET_INCOME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Net Income(?: ([A-Z]{3}))? Mil$").unwrap());
static REVENUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Revenue(?: ([A-Z]{3}))? Mil$").unwrap());

#[derive(Debug, Clone, PartialEq)]
enum Row {
    OperatingMargin,
    FreeCashFlowMargin,
    ReturnOnAssets,
    ReturnOnEquity,
    CurrentRatio,
    DebtToEquity,
    Dividends(Option<String>),
    BookValuePerShare(Option<String>),
    EarningsPerShare(Option<String>),
    NetIncome(Option<String>),
    Revenue(Option<String>),
    FiveYearAverage,
    ThreeYearAverage,
}

fn currency_of(pattern: &Regex, header: &str) -> Option<Option<String>> {
    pattern
        .captures(header)
        .map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

fn classify(header: &str) -> Option<Row> {
    let row = match header {
        "Operating Margin" => Row::OperatingMargin,
        "Free Cash Flow/Sales %" => Row::FreeCashFlowMargin,
        "Return on Assets %" => Row::ReturnOnAssets,
        "Return on Equity %" => Row::ReturnOnEquity,
        "Current Ratio" => Row::CurrentRatio,
        "Debt/Equity" => Row::DebtToEquity,
        "5-Year Average" => Row::FiveYearAverage,
        "3-Year Average" => Row::ThreeYearAverage,
        _ => {
            if let Some(ccy) = currency_of(&DIVIDENDS, header) {
                Row::Dividends(ccy)
            } else if let Some(ccy) = currency_of(&BOOK_VALUE, header) {
                Row::BookValuePerShare(ccy)
            } else if let Some(ccy) = currency_of(&EARNINGS_PER_SHARE, header) {
                Row::EarningsPerShare(ccy)
            } else if let Some(ccy) = currency_of(&NET_INCOME, header) {
                Row::NetIncome(ccy)
            } else if let Some(ccy) = currency_of(&REVENUE, header) {
                Row::Revenue(ccy)
            } else {
                return None;
            }
        }
    };
    Some(row)
}

/// Split the export into rows of cells. Blank lines are dropped by the reader.
pub fn read_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub fn parse_report(text: &str) -> Result<CompanyRecord> {
    parse_rows(&read_rows(text)?)
}

/// Build the financial part of a company record from the export's rows.
///
/// The returned record has no symbol, sector or share count; those come from
/// other pages.
pub fn parse_rows(rows: &[Vec<String>]) -> Result<CompanyRecord> {
    let mut record = CompanyRecord::default();
    let mut current_section = String::new();

    for row in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let header = row[0].as_str();
        let middle = if row.len() > 2 { &row[1..row.len() - 1] } else { &[][..] };

        if !header.is_empty() && middle.iter().all(|cell| cell.is_empty()) {
            match header.strip_prefix(NAME_PREFIX) {
                Some(name) => record.name = name.trim().to_string(),
                None => current_section = header.to_string(),
            }
            continue;
        }

        let kind = match classify(header) {
            Some(kind) => kind,
            None => continue,
        };
        let ttm = || parse_number(row.last().map(String::as_str).unwrap_or_default());
        let average = || parse_number(row.iter().rev().nth(1).map(String::as_str).unwrap_or_default());

        match kind {
            Row::OperatingMargin => record.operating_margin = ttm()? / 100.0,
            Row::FreeCashFlowMargin => record.free_cash_flow_margin = ttm()? / 100.0,
            Row::ReturnOnAssets => record.return_on_assets = ttm()? / 100.0,
            Row::ReturnOnEquity => record.return_on_equity = ttm()? / 100.0,
            Row::CurrentRatio => record.current_ratio = ttm()?,
            Row::DebtToEquity => record.debt_to_equity_ratio = ttm()?,
            Row::Dividends(ccy) => {
                record.dividends_per_share = Money { amount: ttm()?, currency: ccy }
            }
            Row::BookValuePerShare(ccy) => {
                record.book_value_per_share = Money { amount: ttm()?, currency: ccy }
            }
            Row::EarningsPerShare(ccy) => {
                record.earnings_per_share = Money { amount: ttm()?, currency: ccy }
            }
            Row::NetIncome(ccy) => {
                record.net_income = Money { amount: ttm()? * 1_000_000.0, currency: ccy }
            }
            Row::Revenue(ccy) => {
                record.revenue = Money { amount: ttm()? * 1_000_000.0, currency: ccy }
            }
            Row::FiveYearAverage => match current_section.as_str() {
                REVENUE_SECTION => record.revenue_growth_5y = average()? / 100.0,
                NET_INCOME_SECTION => record.earnings_growth_5y = average()? / 100.0,
                _ => {}
            },
            Row::ThreeYearAverage => match current_section.as_str() {
                REVENUE_SECTION => record.revenue_growth_3y = average()? / 100.0,
                NET_INCOME_SECTION => record.earnings_growth_3y = average()? / 100.0,
                _ => {}
            },
        }
    }

    Ok(record)
}
