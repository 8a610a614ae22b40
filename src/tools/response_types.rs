use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::merge::MergeReport;
use crate::data::schema::{Metric, Record};
use crate::data::store::StoreStatus;
use crate::data::validator::Defect;
use crate::engine::types::{GrowthPoint, KpiSummary, MarketCapShare, MetricSeries};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Response for `load_dataset`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadDatasetResponse {
    pub summary: String,
    /// Rows matching the filter, before `limit` is applied
    pub total_rows: usize,
    pub companies: Vec<String>,
    pub date_range: DateRange,
    pub rows: Vec<Record>,
    pub truncated: bool,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `dataset_status`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatasetStatusResponse {
    pub summary: String,
    pub status: StoreStatus,
    pub recent_backups: Vec<String>,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `validate_upload`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidateUploadResponse {
    pub summary: String,
    pub valid: bool,
    pub rows: usize,
    pub columns: Vec<String>,
    pub defects: Vec<Defect>,
    pub messages: Vec<String>,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `import_data`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportResponse {
    pub summary: String,
    pub imported: bool,
    pub defects: Vec<Defect>,
    pub messages: Vec<String>,
    pub merge: Option<MergeReport>,
    pub backup_file: Option<String>,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `reset_to_original`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetResponse {
    pub summary: String,
    pub rows: usize,
    pub backup_file: Option<String>,
    pub original_file: String,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `download_template` and `export_data`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CsvDownloadResponse {
    pub summary: String,
    pub file_name: String,
    pub rows: usize,
    pub csv: String,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `dashboard_summary`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DashboardSummaryResponse {
    pub summary: String,
    pub kpis: KpiSummary,
    pub latest: Vec<Record>,
    pub market_cap_shares: Vec<MarketCapShare>,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `metric_series`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetricSeriesResponse {
    pub summary: String,
    pub metric: Metric,
    pub label: String,
    pub series: Vec<MetricSeries>,
    pub suggested_next_steps: Vec<String>,
}

/// Response for `yoy_growth`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GrowthResponse {
    pub summary: String,
    pub points: Vec<GrowthPoint>,
    pub suggested_next_steps: Vec<String>,
}
