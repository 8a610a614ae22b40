use anyhow::{Context, Result};

use crate::data::error::PipelineError;
use crate::data::merge::merge_with_report;
use crate::data::normalize::normalize;
use crate::data::schema::{Dataset, MergeMode};
use crate::data::store::DatasetStore;
use crate::data::upload::RawTable;
use crate::data::validator::validate;

use super::response_types::ImportResponse;

/// Validate, normalize and merge an upload into the persisted dataset.
///
/// An upload with defects is rejected as a normal response (`imported:
/// false`) listing every defect; the store is left untouched.
pub fn execute(
    store: &DatasetStore,
    file_name: &str,
    bytes: &[u8],
    mode: MergeMode,
) -> Result<ImportResponse> {
    let raw = RawTable::from_upload(file_name, bytes)?;

    let defects = validate(&raw);
    if !defects.is_empty() {
        let messages: Vec<String> = defects.iter().map(ToString::to_string).collect();
        tracing::info!(file = file_name, defects = defects.len(), "Rejected upload");
        return Ok(ImportResponse {
            summary: format!("Import rejected: {}", messages.join(" ")),
            imported: false,
            defects,
            messages,
            merge: None,
            backup_file: None,
            suggested_next_steps: vec![
                "Fix the reported problems and upload again.".to_string(),
                "Call download_template to see the expected layout.".to_string(),
            ],
        });
    }
    if raw.height() == 0 {
        return Err(PipelineError::EmptyUpload.into());
    }

    let incoming = normalize(&raw)?;
    let existing: Dataset = match mode {
        MergeMode::Replace => Vec::new(),
        MergeMode::Append => match store.load() {
            Ok(current) => Dataset::clone(&current),
            Err(PipelineError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e).context("Failed to load the current dataset"),
        },
    };

    let (merged, report) = merge_with_report(&existing, incoming, mode);
    let outcome = store
        .save(&merged, true)
        .context("Failed to save the merged dataset")?;
    tracing::info!(
        file = file_name,
        mode = ?mode,
        rows = report.result_rows,
        duplicates = report.duplicates_removed,
        "Imported upload"
    );

    let backup_file = outcome.backup.map(|p| p.display().to_string());
    let summary = match mode {
        MergeMode::Replace => format!(
            "Replaced the dataset with {} rows from {file_name}.",
            report.result_rows
        ),
        MergeMode::Append => format!(
            "Appended {file_name}: {} existing + {} incoming rows, {} duplicates removed, {} rows now stored.",
            report.existing_rows,
            report.incoming_rows,
            report.duplicates_removed,
            report.result_rows
        ),
    };

    Ok(ImportResponse {
        summary,
        imported: true,
        defects: vec![],
        messages: vec![],
        merge: Some(report),
        backup_file,
        suggested_next_steps: vec![
            "Call dashboard_summary to review the updated KPIs.".to_string(),
            "Call reset_to_original to undo the import and restore the sample.".to_string(),
        ],
    })
}
