use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::types::DatasetFilter;
use crate::data::error::{PipelineError, PipelineResult};
use crate::data::schema::{Dataset, Record};

/// Keep the records matching `filter`, sorted by `(date, company)`.
pub fn apply_filter(dataset: &[Record], filter: &DatasetFilter) -> PipelineResult<Dataset> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(PipelineError::InvalidFilter(format!(
                "start_date ({start}) is after end_date ({end})"
            )));
        }
    }

    let mut result: Dataset = dataset
        .iter()
        .filter(|r| {
            filter
                .companies
                .as_ref()
                .is_none_or(|set| set.iter().any(|c| c == &r.company))
        })
        .filter(|r| filter.start_date.is_none_or(|start| r.date >= start))
        .filter(|r| filter.end_date.is_none_or(|end| r.date <= end))
        .cloned()
        .collect();

    // Stable: same-date rows of one company keep their stored order.
    result.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.company.cmp(&b.company)));
    Ok(result)
}

/// Distinct company names, sorted.
pub fn companies(dataset: &[Record]) -> Vec<String> {
    dataset
        .iter()
        .map(|r| r.company.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Earliest and latest record date.
pub fn date_bounds(dataset: &[Record]) -> Option<(NaiveDate, NaiveDate)> {
    let min = dataset.iter().map(|r| r.date).min()?;
    let max = dataset.iter().map(|r| r.date).max()?;
    Some((min, max))
}
