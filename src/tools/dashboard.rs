//! Read-only views the dashboard draws: KPI cards, metric trend lines and
//! year-over-year growth.

use anyhow::Result;

use crate::data::schema::Metric;
use crate::data::store::DatasetStore;
use crate::engine::filters::apply_filter;
use crate::engine::growth::yoy_growth;
use crate::engine::summary::{kpi_summary, latest_snapshot, market_cap_shares, metric_series};
use crate::engine::types::DatasetFilter;

use super::response_types::{DashboardSummaryResponse, GrowthResponse, MetricSeriesResponse};

pub fn summary(store: &DatasetStore, filter: &DatasetFilter) -> Result<DashboardSummaryResponse> {
    let dataset = apply_filter(&store.load()?, filter)?;
    let kpis = kpi_summary(&dataset);

    let summary = match kpis.latest_date {
        None => "No rows match the requested filter.".to_string(),
        Some(latest) => format!(
            "{} companies as of {latest}: revenue ${}M, net income ${}M, market cap ${}M{}.",
            kpis.companies,
            kpis.total_revenue,
            kpis.total_net_income,
            kpis.combined_market_cap,
            kpis.average_pe_ratio
                .map(|pe| format!(", average P/E {pe:.1}"))
                .unwrap_or_default(),
        ),
    };

    Ok(DashboardSummaryResponse {
        summary,
        latest: latest_snapshot(&dataset),
        market_cap_shares: market_cap_shares(&dataset),
        kpis,
        suggested_next_steps: vec![
            "Call metric_series to chart a metric over time.".to_string(),
            "Call yoy_growth to compare annual revenue growth.".to_string(),
        ],
    })
}

pub fn series(
    store: &DatasetStore,
    filter: &DatasetFilter,
    metric: Metric,
) -> Result<MetricSeriesResponse> {
    let dataset = apply_filter(&store.load()?, filter)?;
    let series = metric_series(&dataset, metric);
    let points: usize = series.iter().map(|s| s.points.len()).sum();

    Ok(MetricSeriesResponse {
        summary: format!(
            "{} across {} companies, {points} data points.",
            metric.label(),
            series.len()
        ),
        metric,
        label: metric.label().to_string(),
        series,
        suggested_next_steps: vec![
            "Call dashboard_summary for the latest headline figures.".to_string(),
        ],
    })
}

pub fn growth(store: &DatasetStore, filter: &DatasetFilter) -> Result<GrowthResponse> {
    let dataset = apply_filter(&store.load()?, filter)?;
    let points = yoy_growth(&dataset)?;

    let summary = match points
        .iter()
        .max_by(|a, b| a.growth_pct.total_cmp(&b.growth_pct))
    {
        Some(best) => format!(
            "{} growth points. Highest: {} in {} at {:.1}%.",
            points.len(),
            best.company,
            best.year,
            best.growth_pct
        ),
        None => "Not enough consecutive years to compute growth.".to_string(),
    };

    Ok(GrowthResponse {
        summary,
        points,
        suggested_next_steps: vec![
            "Call metric_series with metric 'Revenue' to see the quarterly trend.".to_string(),
        ],
    })
}
