use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::types::{KpiSummary, MarketCapShare, MetricPoint, MetricSeries};
use crate::data::schema::{Metric, Record};

/// The latest-dated record of every company, ordered by company name.
/// On a date tie the record stored last wins.
pub fn latest_snapshot(dataset: &[Record]) -> Vec<Record> {
    let mut latest: BTreeMap<&str, &Record> = BTreeMap::new();
    for record in dataset {
        latest
            .entry(record.company.as_str())
            .and_modify(|current| {
                if record.date >= current.date {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest.into_values().cloned().collect()
}

/// Headline figures over the latest record of each company.
///
/// The average P/E takes each company's latest *defined* P/E, which may come
/// from an earlier quarter than its latest record. Totals saturate at the
/// `i64` bounds.
pub fn kpi_summary(dataset: &[Record]) -> KpiSummary {
    let latest = latest_snapshot(dataset);

    let mut latest_pe: BTreeMap<&str, (NaiveDate, f64)> = BTreeMap::new();
    for record in dataset {
        let Some(pe) = record.pe_ratio else { continue };
        latest_pe
            .entry(record.company.as_str())
            .and_modify(|current| {
                if record.date >= current.0 {
                    *current = (record.date, pe);
                }
            })
            .or_insert((record.date, pe));
    }
    let average_pe_ratio = (!latest_pe.is_empty())
        .then(|| latest_pe.values().map(|(_, pe)| pe).sum::<f64>() / latest_pe.len() as f64);

    KpiSummary {
        companies: latest.len(),
        total_revenue: total(latest.iter().map(|r| r.revenue)),
        total_net_income: total(latest.iter().map(|r| r.net_income)),
        combined_market_cap: total(latest.iter().map(|r| r.market_cap)),
        average_pe_ratio,
        latest_date: latest.iter().map(|r| r.date).max(),
    }
}

/// Sum in `i128`, clamped back into `i64`.
fn total(values: impl Iterator<Item = i64>) -> i64 {
    let sum: i128 = values.map(i128::from).sum();
    i64::try_from(sum).unwrap_or(if sum < 0 { i64::MIN } else { i64::MAX })
}

/// One date-sorted series per company. Undefined P/E values are skipped.
pub fn metric_series(dataset: &[Record], metric: Metric) -> Vec<MetricSeries> {
    let mut by_company: BTreeMap<&str, Vec<MetricPoint>> = BTreeMap::new();
    for record in dataset {
        let points = by_company.entry(record.company.as_str()).or_default();
        if let Some(value) = record.metric(metric) {
            points.push(MetricPoint {
                date: record.date,
                value,
            });
        }
    }

    by_company
        .into_iter()
        .map(|(company, mut points)| {
            points.sort_by_key(|p| p.date);
            MetricSeries {
                company: company.to_string(),
                metric,
                points,
            }
        })
        .collect()
}

/// Each company's share of the combined latest market cap.
pub fn market_cap_shares(dataset: &[Record]) -> Vec<MarketCapShare> {
    let latest = latest_snapshot(dataset);
    let combined: f64 = latest.iter().map(|r| r.market_cap as f64).sum();
    latest
        .into_iter()
        .map(|r| MarketCapShare {
            share_pct: if combined > 0.0 {
                r.market_cap as f64 / combined * 100.0
            } else {
                0.0
            },
            company: r.company,
            market_cap: r.market_cap,
        })
        .collect()
}
