use anyhow::{Context, Result};

use crate::data::store::DatasetStore;

use super::response_types::ResetResponse;

pub fn execute(store: &DatasetStore) -> Result<ResetResponse> {
    let outcome = store
        .reset_to_original()
        .context("Failed to restore the original dataset")?;
    let backup_file = outcome.backup.map(|p| p.display().to_string());
    let original_file = store.original_backup_path().display().to_string();

    let summary = match &backup_file {
        Some(backup) => format!(
            "Restored the original dataset ({} rows). The previous data was backed up to {backup}.",
            outcome.rows
        ),
        None => format!("Restored the original dataset ({} rows).", outcome.rows),
    };

    Ok(ResetResponse {
        summary,
        rows: outcome.rows,
        backup_file,
        original_file,
        suggested_next_steps: vec![
            "Call dashboard_summary to review the restored KPIs.".to_string(),
            "Call dataset_status to list the backups taken so far.".to_string(),
        ],
    })
}
