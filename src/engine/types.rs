use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::schema::Metric;

/// Read-side projection over a dataset: which companies and which dates.
///
/// `companies: None` keeps every company; both date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetFilter {
    pub companies: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Year-over-year revenue growth of one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GrowthPoint {
    pub company: String,
    pub year: i32,
    /// Total revenue of `year - 1`, millions
    pub previous_revenue: i64,
    /// Total revenue of `year`, millions
    pub revenue: i64,
    pub growth_pct: f64,
}

/// Headline figures over the latest quarter reported by each company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KpiSummary {
    pub companies: usize,
    pub total_revenue: i64,
    pub total_net_income: i64,
    pub combined_market_cap: i64,
    /// Mean over companies whose latest P/E is defined.
    pub average_pe_ratio: Option<f64>,
    pub latest_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-ordered values of one metric for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricSeries {
    pub company: String,
    pub metric: Metric,
    pub points: Vec<MetricPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketCapShare {
    pub company: String,
    pub market_cap: i64,
    pub share_pct: f64,
}
