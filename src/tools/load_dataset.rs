use anyhow::Result;

use crate::data::store::DatasetStore;
use crate::engine::filters::{apply_filter, companies, date_bounds};
use crate::engine::types::DatasetFilter;

use super::response_types::{DateRange, LoadDatasetResponse};

pub fn execute(
    store: &DatasetStore,
    filter: &DatasetFilter,
    limit: Option<usize>,
) -> Result<LoadDatasetResponse> {
    let dataset = store.load()?;
    let mut rows = apply_filter(&dataset, filter)?;
    let total_rows = rows.len();

    let companies = companies(&rows);
    let date_range = match date_bounds(&rows) {
        Some((start, end)) => DateRange {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
        },
        None => DateRange {
            start: None,
            end: None,
        },
    };

    let truncated = limit.is_some_and(|n| total_rows > n);
    if let Some(n) = limit {
        rows.truncate(n);
    }

    let summary = if total_rows == 0 {
        "No rows match the requested filter.".to_string()
    } else {
        format!(
            "Loaded {total_rows} rows for {} companies ({} to {}){}.",
            companies.len(),
            date_range.start.as_deref().unwrap_or("?"),
            date_range.end.as_deref().unwrap_or("?"),
            if truncated {
                format!(", showing the first {}", rows.len())
            } else {
                String::new()
            },
        )
    };

    let suggested_next_steps = if total_rows == 0 {
        vec![
            "Widen the date range or drop the company filter.".to_string(),
            "Call dataset_status to check the persisted file.".to_string(),
        ]
    } else {
        vec![
            "Call dashboard_summary for headline KPIs.".to_string(),
            "Call yoy_growth to compare annual revenue growth.".to_string(),
        ]
    };

    Ok(LoadDatasetResponse {
        summary,
        total_rows,
        companies,
        date_range,
        rows,
        truncated,
        suggested_next_steps,
    })
}
