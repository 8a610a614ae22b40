use anyhow::Result;

use crate::data::store::DatasetStore;

use super::response_types::DatasetStatusResponse;

const RECENT_BACKUPS: usize = 5;

pub fn execute(store: &DatasetStore) -> Result<DatasetStatusResponse> {
    let status = store.status()?;
    let recent_backups: Vec<String> = store
        .list_backups()?
        .iter()
        .take(RECENT_BACKUPS)
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let summary = match (status.exists, status.rows) {
        (false, _) => format!("No dataset file at {}.", status.file_path),
        (true, Some(rows)) => format!(
            "Dataset at {} holds {rows} rows. Last updated: {}. {} backups on disk.",
            status.file_path,
            status.last_updated.as_deref().unwrap_or("unknown"),
            status.backups,
        ),
        (true, None) => format!(
            "Dataset at {} exists but could not be read.",
            status.file_path
        ),
    };

    let suggested_next_steps = match (status.exists, status.rows) {
        (true, Some(_)) => vec![
            "Call load_dataset to inspect rows.".to_string(),
            "Call export_data to download the current dataset as CSV.".to_string(),
        ],
        _ => vec!["Call reset_to_original to restore the sample dataset.".to_string()],
    };

    Ok(DatasetStatusResponse {
        summary,
        status,
        recent_backups,
        suggested_next_steps,
    })
}
