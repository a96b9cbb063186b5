// src/models.rs
use serde::{Deserialize, Serialize};

/// A monetary figure with the currency the source quoted it in, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Option<String>,
}

impl Money {
    pub fn new(amount: f64, currency: Option<&str>) -> Self {
        Money {
            amount,
            currency: currency.map(str::to_string),
        }
    }
}

/// Everything collected about one ticker during a run.
///
/// Ratios are fractions (12% is `0.12`); totals are absolute currency units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub operating_margin: f64,
    pub free_cash_flow_margin: f64,
    pub return_on_assets: f64,
    pub return_on_equity: f64,
    pub current_ratio: f64,
    pub debt_to_equity_ratio: f64,
    pub revenue: Money,
    pub net_income: Money,
    pub earnings_per_share: Money,
    pub earnings_growth_3y: f64,
    pub earnings_growth_5y: f64,
    pub revenue_growth_3y: f64,
    pub revenue_growth_5y: f64,
    pub book_value_per_share: Money,
    pub dividends_per_share: Money,
    pub share_count: f64,
}

impl CompanyRecord {
    pub fn new(symbol: &str) -> Self {
        CompanyRecord {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    /// `1000 × OM × FCFM × ROA × ROE`.
    pub fn profitability_score(&self) -> f64 {
        1000.0
            * self.operating_margin
            * self.free_cash_flow_margin
            * self.return_on_assets
            * self.return_on_equity
    }

    fn per_share(&self, total: f64) -> f64 {
        if self.share_count > 0.0 {
            total / self.share_count
        } else {
            0.0
        }
    }

    /// Net income over shares outstanding, or the reported EPS when no share count is known.
    pub fn earnings_per_share(&self) -> f64 {
        if self.share_count > 0.0 {
            self.per_share(self.net_income.amount)
        } else {
            self.earnings_per_share.amount
        }
    }

    pub fn revenue_per_share(&self) -> f64 {
        self.per_share(self.revenue.amount)
    }

    /// Worst of the 3- and 5-year averages.
    pub fn earnings_growth(&self) -> f64 {
        self.earnings_growth_3y.min(self.earnings_growth_5y)
    }

    pub fn revenue_growth(&self) -> f64 {
        self.revenue_growth_3y.min(self.revenue_growth_5y)
    }
}

/// The ticker -> record mapping for one market, in configured order.
#[derive(Debug, Clone, Default)]
pub struct MarketReport {
    pub companies: Vec<CompanyRecord>,
}

impl MarketReport {
    pub fn get(&self, symbol: &str) -> Option<&CompanyRecord> {
        self.companies.iter().find(|c| c.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
