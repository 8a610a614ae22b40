use anyhow::{Context, Result};

use crate::data::store::{encode_csv, template_csv, DatasetStore};
use crate::engine::filters::apply_filter;
use crate::engine::types::DatasetFilter;

use super::response_types::CsvDownloadResponse;

pub const TEMPLATE_FILE_NAME: &str = "financial_data_template.csv";

/// A one-row CSV showing the expected upload layout.
pub fn template() -> Result<CsvDownloadResponse> {
    let csv = template_csv()?;
    Ok(CsvDownloadResponse {
        summary: "Template with the eight required columns and one example row.".to_string(),
        file_name: TEMPLATE_FILE_NAME.to_string(),
        rows: 1,
        csv,
        suggested_next_steps: vec![
            "Replace the example row with your data, then call validate_upload.".to_string(),
        ],
    })
}

/// The (optionally filtered) dataset in the persisted CSV layout, named
/// `financial_data_<YYYYMMDD>.csv` after today's date.
pub fn export(store: &DatasetStore, filter: &DatasetFilter) -> Result<CsvDownloadResponse> {
    let dataset = store.load()?;
    let rows = apply_filter(&dataset, filter)?;
    let bytes = encode_csv(&rows)?;
    let csv = String::from_utf8(bytes).context("Encoded CSV is not UTF-8")?;
    let file_name = format!(
        "financial_data_{}.csv",
        chrono::Local::now().format("%Y%m%d")
    );

    let summary = format!("Exported {} rows as {file_name}.", rows.len());
    Ok(CsvDownloadResponse {
        summary,
        file_name,
        rows: rows.len(),
        csv,
        suggested_next_steps: vec![
            "Edit the CSV and re-upload it with import_data in 'replace' mode.".to_string(),
        ],
    })
}
