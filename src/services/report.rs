// src/services/report.rs
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::models::MarketReport;

/// One line of the ranked output, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "OM")]
    pub operating_margin: f64,
    #[serde(rename = "FCFM")]
    pub free_cash_flow_margin: f64,
    #[serde(rename = "ROA")]
    pub return_on_assets: f64,
    #[serde(rename = "ROE")]
    pub return_on_equity: f64,
    #[serde(rename = "PScore")]
    pub pscore: f64,
    #[serde(rename = "CR")]
    pub current_ratio: f64,
    #[serde(rename = "D/E")]
    pub debt_to_equity: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "YEG")]
    pub earnings_growth: f64,
    #[serde(rename = "YRG")]
    pub revenue_growth: f64,
    #[serde(rename = "EPS")]
    pub earnings_per_share: f64,
    #[serde(rename = "RPS")]
    pub revenue_per_share: f64,
    #[serde(rename = "BPS")]
    pub book_value_per_share: f64,
    #[serde(rename = "DPS")]
    pub dividends_per_share: f64,
}

pub const HEADERS: [&str; 17] = [
    "Symbol", "Name", "Sector", "OM", "FCFM", "ROA", "ROE", "PScore", "CR", "D/E", "Revenue",
    "YEG", "YRG", "EPS", "RPS", "BPS", "DPS",
];

/// Rows ranked by PScore, best first. Equal scores keep the configured order.
pub fn to_rows(report: &MarketReport) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = report
        .companies
        .iter()
        .map(|c| ReportRow {
            symbol: c.symbol.clone(),
            name: c.name.clone(),
            sector: c.sector.clone(),
            operating_margin: c.operating_margin,
            free_cash_flow_margin: c.free_cash_flow_margin,
            return_on_assets: c.return_on_assets,
            return_on_equity: c.return_on_equity,
            pscore: c.profitability_score(),
            current_ratio: c.current_ratio,
            debt_to_equity: c.debt_to_equity_ratio,
            revenue: c.revenue.amount,
            earnings_growth: c.earnings_growth(),
            revenue_growth: c.revenue_growth(),
            earnings_per_share: c.earnings_per_share(),
            revenue_per_share: c.revenue_per_share(),
            book_value_per_share: c.book_value_per_share.amount,
            dividends_per_share: c.dividends_per_share.amount,
        })
        .collect();
    rows.sort_by(|a, b| b.pscore.total_cmp(&a.pscore));
    rows
}

pub fn write_csv<P: AsRef<Path>>(path: P, rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    if rows.is_empty() {
        writer.write_record(HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.as_ref().display());
    Ok(())
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn cells(row: &ReportRow) -> Vec<String> {
    vec![
        row.symbol.clone(),
        row.name.clone(),
        row.sector.clone(),
        format!("{:.4}", row.operating_margin),
        format!("{:.4}", row.free_cash_flow_margin),
        format!("{:.4}", row.return_on_assets),
        format!("{:.4}", row.return_on_equity),
        format!("{:.4}", row.pscore),
        format!("{:.2}", row.current_ratio),
        format!("{:.2}", row.debt_to_equity),
        format!("{:.0}", row.revenue),
        format!("{:.4}", row.earnings_growth),
        format!("{:.4}", row.revenue_growth),
        format!("{:.2}", row.earnings_per_share),
        format!("{:.2}", row.revenue_per_share),
        format!("{:.2}", row.book_value_per_share),
        format!("{:.2}", row.dividends_per_share),
    ]
}

/// Boxed, column-aligned text table.
pub fn render_table(rows: &[ReportRow]) -> String {
    let body: Vec<Vec<String>> = rows.iter().map(cells).collect();
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = format!(
        "+{}+",
        widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+")
    );
    let format_line = |line: &[String]| {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!(" {}{} ", cell, " ".repeat(pad))
            })
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut out = vec![rule.clone(), format_line(&header), rule.clone()];
    out.extend(body.iter().map(|line| format_line(line)));
    out.push(rule);
    out.join("\n")
}

pub fn print_table(rows: &[ReportRow]) {
    println!("{}", render_table(rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyRecord, Money};

    fn company(symbol: &str, margin: f64) -> CompanyRecord {
        CompanyRecord {
            name: format!("{} Corp, Ltd.", symbol),
            sector: "Energy".to_string(),
            operating_margin: margin,
            free_cash_flow_margin: 0.1,
            return_on_assets: 0.05,
            return_on_equity: 0.123456789,
            current_ratio: 1.3,
            debt_to_equity_ratio: 0.7,
            revenue: Money::new(2_500_000_000.0, Some("CAD")),
            net_income: Money::new(300_000_000.0, Some("CAD")),
            book_value_per_share: Money::new(21.7, Some("CAD")),
            dividends_per_share: Money::new(1.1, Some("CAD")),
            share_count: 150_000_000.0,
            earnings_growth_3y: 0.031,
            earnings_growth_5y: 0.027,
            revenue_growth_3y: 0.012,
            revenue_growth_5y: 0.019,
            ..CompanyRecord::new(symbol)
        }
    }

    #[test]
    fn test_rows_are_ranked_by_score() {
        let report = MarketReport {
            companies: vec![company("LOW", 0.01), company("HIGH", 0.3), company("MID", 0.1)],
        };
        let symbols: Vec<String> = to_rows(&report).into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn test_derived_columns() {
        let report = MarketReport { companies: vec![company("AAA", 0.2)] };
        let row = &to_rows(&report)[0];

        assert_eq!(row.earnings_per_share, 2.0);
        assert_eq!(row.earnings_growth, 0.027);
        assert_eq!(row.revenue_growth, 0.012);
        assert_eq!(row.pscore, report.companies[0].profitability_score());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market.csv");
        let rows = to_rows(&MarketReport {
            companies: vec![company("AAA", 0.2), company("BBB", 0.15)],
        });

        write_csv(&path, &rows).unwrap();
        assert_eq!(read_csv(&path).unwrap(), rows);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&HEADERS.join(",")));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_csv(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), HEADERS.join(","));
        assert!(read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_table_is_aligned() {
        let rows = to_rows(&MarketReport { companies: vec![company("AAA", 0.2)] });
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("| Symbol "));
        assert!(lines[3].contains("AAA Corp, Ltd."));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}
