use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_COL: &str = "Date";
pub const COMPANY_COL: &str = "Company";
pub const REVENUE_COL: &str = "Revenue";
pub const NET_INCOME_COL: &str = "NetIncome";
pub const OPERATING_EXPENSES_COL: &str = "OperatingExpenses";
pub const MARKET_CAP_COL: &str = "MarketCap";
pub const STOCK_PRICE_COL: &str = "StockPrice";
pub const PE_RATIO_COL: &str = "PERatio";

/// Every column an upload must carry, in persisted order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    DATE_COL,
    COMPANY_COL,
    REVENUE_COL,
    NET_INCOME_COL,
    OPERATING_EXPENSES_COL,
    MARKET_CAP_COL,
    STOCK_PRICE_COL,
    PE_RATIO_COL,
];

/// Canonical on-disk date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The six numeric fields of a record. Selections arriving from a client
/// (which metric to chart) are deserialized straight into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Metric {
    Revenue,
    NetIncome,
    OperatingExpenses,
    MarketCap,
    StockPrice,
    #[serde(rename = "PERatio")]
    PeRatio,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Revenue,
        Metric::NetIncome,
        Metric::OperatingExpenses,
        Metric::MarketCap,
        Metric::StockPrice,
        Metric::PeRatio,
    ];

    /// Column header used in CSV files.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Revenue => REVENUE_COL,
            Metric::NetIncome => NET_INCOME_COL,
            Metric::OperatingExpenses => OPERATING_EXPENSES_COL,
            Metric::MarketCap => MARKET_CAP_COL,
            Metric::StockPrice => STOCK_PRICE_COL,
            Metric::PeRatio => PE_RATIO_COL,
        }
    }

    /// Human-readable axis label, including the unit.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue (Millions)",
            Metric::NetIncome => "Net Income (Millions)",
            Metric::OperatingExpenses => "Operating Expenses (Millions)",
            Metric::MarketCap => "Market Cap (Millions)",
            Metric::StockPrice => "Stock Price ($)",
            Metric::PeRatio => "P/E Ratio",
        }
    }

    /// Whether an empty cell is an acceptable value for this field.
    pub fn nullable(self) -> bool {
        matches!(self, Metric::PeRatio)
    }

    /// Amounts stored as whole millions of USD.
    pub fn monetary(self) -> bool {
        matches!(
            self,
            Metric::Revenue | Metric::NetIncome | Metric::OperatingExpenses | Metric::MarketCap
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// How an incoming dataset combines with the one already persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Discard the existing dataset entirely.
    #[default]
    Replace,
    /// Keep existing rows, add incoming rows, drop exact duplicates.
    Append,
}

/// One company-quarter observation.
///
/// `year` and `quarter` are derived from `date` and are never written to disk;
/// equality and hashing only consider the persisted fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    pub date: NaiveDate,
    pub company: String,
    /// Millions
    pub revenue: i64,
    /// Millions
    pub net_income: i64,
    /// Millions
    pub operating_expenses: i64,
    /// Millions
    pub market_cap: i64,
    pub stock_price: f64,
    /// `None` when the ratio is undefined (non-positive earnings, or left blank).
    pub pe_ratio: Option<f64>,
    pub year: i32,
    pub quarter: u32,
}

impl Record {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDate,
        company: impl Into<String>,
        revenue: i64,
        net_income: i64,
        operating_expenses: i64,
        market_cap: i64,
        stock_price: f64,
        pe_ratio: Option<f64>,
    ) -> Self {
        Self {
            date,
            company: company.into(),
            revenue,
            net_income,
            operating_expenses,
            market_cap,
            stock_price,
            pe_ratio,
            year: date.year(),
            quarter: quarter_of(date),
        }
    }

    /// Recompute `year` and `quarter` from `date`.
    pub fn refresh_derived(&mut self) {
        self.year = self.date.year();
        self.quarter = quarter_of(self.date);
    }

    /// Value of a numeric field; `None` only for an undefined P/E ratio.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Revenue => Some(self.revenue as f64),
            Metric::NetIncome => Some(self.net_income as f64),
            Metric::OperatingExpenses => Some(self.operating_expenses as f64),
            Metric::MarketCap => Some(self.market_cap as f64),
            Metric::StockPrice => Some(self.stock_price),
            Metric::PeRatio => self.pe_ratio,
        }
    }

    /// Identity of the persisted fields, used for exact-duplicate detection.
    ///
    /// Floats are compared bitwise so that `NaN`-free values round-trip through
    /// a hash set the same way they compare with `==`.
    pub fn persisted_key(&self) -> PersistedKey {
        PersistedKey {
            date: self.date,
            company: self.company.clone(),
            revenue: self.revenue,
            net_income: self.net_income,
            operating_expenses: self.operating_expenses,
            market_cap: self.market_cap,
            stock_price: canonical_bits(self.stock_price),
            pe_ratio: self.pe_ratio.map(canonical_bits),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.persisted_key() == other.persisted_key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersistedKey {
    date: NaiveDate,
    company: String,
    revenue: i64,
    net_income: i64,
    operating_expenses: i64,
    market_cap: i64,
    stock_price: u64,
    pe_ratio: Option<u64>,
}

/// `-0.0` and `0.0` compare equal, so they must share a key.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Calendar quarter (1..=4) of a date: `ceil(month / 3)`.
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month().div_ceil(3)
}

/// The full ordered collection of records currently considered authoritative.
pub type Dataset = Vec<Record>;
