use std::collections::BTreeMap;

use super::types::GrowthPoint;
use crate::data::error::PipelineResult;
use crate::data::schema::Record;

/// Year-over-year revenue growth per company.
///
/// Quarterly revenue is summed per calendar year; a point is produced for
/// year `Y` only when the same company has a year `Y - 1` total and that
/// total is positive. Sorted by company, then year.
pub fn yoy_growth(dataset: &[Record]) -> PipelineResult<Vec<GrowthPoint>> {
    let mut yearly: BTreeMap<(&str, i32), i64> = BTreeMap::new();
    for record in dataset {
        let total = yearly.entry((record.company.as_str(), record.year)).or_default();
        *total = total.saturating_add(record.revenue);
    }

    let mut points = Vec::new();
    let mut previous: Option<((&str, i32), i64)> = None;
    for (&(company, year), &revenue) in &yearly {
        if let Some(((prev_company, prev_year), prev_revenue)) = previous {
            if prev_company == company && prev_year == year - 1 && prev_revenue > 0 {
                points.push(GrowthPoint {
                    company: company.to_string(),
                    year,
                    previous_revenue: prev_revenue,
                    revenue,
                    growth_pct: (revenue as f64 - prev_revenue as f64) / prev_revenue as f64
                        * 100.0,
                });
            }
        }
        previous = Some(((company, year), revenue));
    }

    Ok(points)
}
