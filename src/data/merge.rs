use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::schema::{Dataset, MergeMode};

/// Row accounting for one merge, surfaced to the operator after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergeReport {
    pub mode: MergeMode,
    pub existing_rows: usize,
    pub incoming_rows: usize,
    pub duplicates_removed: usize,
    pub result_rows: usize,
}

/// Combine the persisted dataset with a freshly normalized one.
pub fn merge(existing: &Dataset, incoming: Dataset, mode: MergeMode) -> Dataset {
    merge_with_report(existing, incoming, mode).0
}

/// [`merge`], also reporting how many rows each side contributed.
///
/// `Append` keeps the first occurrence of every distinct persisted row, in
/// order: existing rows first, then incoming ones. Derived fields play no part
/// in the comparison and are recomputed on the result.
pub fn merge_with_report(
    existing: &Dataset,
    incoming: Dataset,
    mode: MergeMode,
) -> (Dataset, MergeReport) {
    let existing_rows = existing.len();
    let incoming_rows = incoming.len();

    let merged = match mode {
        MergeMode::Replace => incoming,
        MergeMode::Append => {
            let mut seen = HashSet::with_capacity(existing_rows + incoming_rows);
            existing
                .iter()
                .cloned()
                .chain(incoming)
                .filter(|record| seen.insert(record.persisted_key()))
                .map(|mut record| {
                    record.refresh_derived();
                    record
                })
                .collect()
        }
    };

    let result_rows = merged.len();
    let duplicates_removed = match mode {
        MergeMode::Replace => 0,
        MergeMode::Append => existing_rows + incoming_rows - result_rows,
    };

    (
        merged,
        MergeReport {
            mode,
            existing_rows,
            incoming_rows,
            duplicates_removed,
            result_rows,
        },
    )
}
