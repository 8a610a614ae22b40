use anyhow::Result;

use crate::data::upload::RawTable;
use crate::data::validator::validate;

use super::response_types::ValidateUploadResponse;

/// Parse an upload and report its defects without touching the store.
pub fn execute(file_name: &str, bytes: &[u8]) -> Result<ValidateUploadResponse> {
    let raw = RawTable::from_upload(file_name, bytes)?;
    let defects = validate(&raw);
    let messages: Vec<String> = defects.iter().map(ToString::to_string).collect();
    let valid = defects.is_empty();
    let rows = raw.height();

    let summary = if valid {
        format!("{file_name} is valid: {rows} rows ready to import.")
    } else {
        format!(
            "{file_name} has {} problem(s): {}",
            defects.len(),
            messages.join(" ")
        )
    };

    let suggested_next_steps = if valid {
        vec![
            "Call import_data with mode 'append' to add these rows, or 'replace' to swap the dataset."
                .to_string(),
        ]
    } else {
        vec![
            "Fix the reported columns and upload again.".to_string(),
            "Call download_template to see the expected layout.".to_string(),
        ]
    };

    Ok(ValidateUploadResponse {
        summary,
        valid,
        rows,
        columns: raw.column_names(),
        defects,
        messages,
        suggested_next_steps,
    })
}
