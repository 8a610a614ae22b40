pub mod dashboard;
pub mod dataset_status;
pub mod download;
pub mod import_data;
pub mod load_dataset;
pub mod reset;
pub mod response_types;
pub mod validate_upload;

use anyhow::{Context, Result};
use base64::Engine as _;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::data::schema::DATE_FORMAT;
use crate::engine::types::DatasetFilter;

/// How an uploaded file's `content` string is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    /// UTF-8 text, suitable for CSV
    #[default]
    Text,
    /// Standard base64, required for spreadsheets
    Base64,
}

/// Raw bytes of an uploaded file.
pub fn decode_content(content: &str, encoding: ContentEncoding) -> Result<Vec<u8>> {
    match encoding {
        ContentEncoding::Text => Ok(content.as_bytes().to_vec()),
        ContentEncoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(content.trim())
            .context("content is not valid base64"),
    }
}

/// Build a dataset filter from `YYYY-MM-DD` strings and an optional company list.
pub fn build_filter(
    companies: Option<Vec<String>>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<DatasetFilter> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {s}"))
    };
    Ok(DatasetFilter {
        companies,
        start_date: start_date.map(parse).transpose()?,
        end_date: end_date.map(parse).transpose()?,
    })
}
