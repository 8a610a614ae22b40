use garde::Validate;
use rmcp::{
    handler::server::{
        router::tool::ToolRouter,
        wrapper::{Json, Parameters},
    },
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::data::schema::{MergeMode, Metric};
use crate::data::store::DatasetStore;
use crate::engine::types::DatasetFilter;
use crate::tools;
use crate::tools::response_types::{
    CsvDownloadResponse, DashboardSummaryResponse, DatasetStatusResponse, GrowthResponse,
    ImportResponse, LoadDatasetResponse, MetricSeriesResponse, ResetResponse,
    ValidateUploadResponse,
};
use crate::tools::ContentEncoding;

#[derive(Clone)]
pub struct FinboardServer {
    pub store: Arc<DatasetStore>,
    tool_router: ToolRouter<Self>,
}

impl FinboardServer {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }
}

/// Row selection shared by the read tools.
#[derive(Debug, Default, Deserialize, JsonSchema, Validate)]
pub struct FilterParams {
    /// Company names to keep (e.g. ["Apple", "Meta"]); omit for all
    #[garde(inner(length(min = 1), inner(length(min = 1, max = 100))))]
    pub companies: Option<Vec<String>>,
    /// Start date filter, inclusive (YYYY-MM-DD)
    #[garde(inner(pattern(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$")))]
    pub start_date: Option<String>,
    /// End date filter, inclusive (YYYY-MM-DD)
    #[garde(inner(pattern(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$")))]
    pub end_date: Option<String>,
}

impl FilterParams {
    fn to_filter(&self) -> Result<DatasetFilter, String> {
        tools::build_filter(
            self.companies.clone(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
        .map_err(|e| format!("Validation error: {e}"))
    }
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct LoadDatasetParams {
    #[serde(flatten)]
    #[garde(dive)]
    pub filter: FilterParams,
    /// Maximum rows to return (default: all)
    #[garde(inner(range(min = 1, max = 10_000)))]
    pub limit: Option<usize>,
}

/// An uploaded file as sent by the client.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UploadParams {
    /// Original file name; its extension selects the reader (.csv, .xlsx, .xls, .xlsm, .ods)
    #[garde(length(min = 1, max = 255), pattern(r"^[^/\\]+$"))]
    pub file_name: String,
    /// File content: UTF-8 text for CSV, base64 for spreadsheets
    #[garde(skip)]
    pub content: String,
    /// How `content` is encoded (default: "text")
    #[garde(skip)]
    pub content_encoding: Option<ContentEncoding>,
}

impl UploadParams {
    fn bytes(&self) -> Result<Vec<u8>, String> {
        tools::decode_content(&self.content, self.content_encoding.unwrap_or_default())
            .map_err(|e| format!("Validation error: {e}"))
    }
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ImportDataParams {
    #[serde(flatten)]
    #[garde(dive)]
    pub upload: UploadParams,
    /// "replace" discards the current dataset; "append" keeps it and drops exact duplicate rows
    #[garde(skip)]
    pub mode: MergeMode,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct MetricSeriesParams {
    #[serde(flatten)]
    #[garde(dive)]
    pub filter: FilterParams,
    /// Metric to chart: Revenue, NetIncome, OperatingExpenses, MarketCap, StockPrice or PERatio
    #[garde(skip)]
    pub metric: Metric,
}

#[tool_router]
impl FinboardServer {
    /// Load the persisted financial dataset, optionally filtered. **START HERE.**
    ///
    /// **When to use**: To inspect rows, companies and the covered date range
    /// **Prerequisites**: None (the sample dataset is seeded on first start)
    /// **Next tools**: dashboard_summary(), metric_series(), yoy_growth()
    ///
    /// Rows are sorted by date, then company. `limit` caps the rows returned;
    /// `total_rows` always reports the full match count.
    #[tool(name = "load_dataset")]
    async fn load_dataset(
        &self,
        Parameters(params): Parameters<LoadDatasetParams>,
    ) -> Result<Json<LoadDatasetResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let filter = params.filter.to_filter()?;
        tools::load_dataset::execute(&self.store, &filter, params.limit)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Report the dataset file's presence, size, last update and backups.
    ///
    /// **Prerequisites**: None
    /// **Next tools**: load_dataset(), or reset_to_original() if the file is missing
    #[tool(name = "dataset_status")]
    async fn dataset_status(&self) -> Result<Json<DatasetStatusResponse>, String> {
        tools::dataset_status::execute(&self.store)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Check an upload against the required schema without importing it.
    ///
    /// **When to use**: Before import_data, to see every problem at once
    /// **Checks**: all eight columns present, dates parse (YYYY-MM-DD), numeric
    ///   columns parse (blank or NA allowed only for PERatio), company not blank
    /// **Next tools**: import_data() once valid, download_template() otherwise
    #[tool(name = "validate_upload")]
    async fn validate_upload(
        &self,
        Parameters(params): Parameters<UploadParams>,
    ) -> Result<Json<ValidateUploadResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let bytes = params.bytes()?;
        tools::validate_upload::execute(&params.file_name, &bytes)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Validate, normalize and merge an upload into the persisted dataset.
    ///
    /// **Modes**:
    ///   - replace: the upload becomes the whole dataset
    ///   - append: existing rows are kept; exact duplicate rows are dropped
    /// **Side effects**: the previous file is backed up before it is overwritten.
    ///   An upload with defects is rejected (`imported: false`) and nothing changes.
    /// **Next tools**: dashboard_summary(), or reset_to_original() to undo
    #[tool(name = "import_data")]
    async fn import_data(
        &self,
        Parameters(params): Parameters<ImportDataParams>,
    ) -> Result<Json<ImportResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let bytes = params.upload.bytes()?;
        tools::import_data::execute(&self.store, &params.upload.file_name, &bytes, params.mode)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Restore the shipped sample dataset, backing up the current file first.
    ///
    /// Idempotent: repeated calls leave the same dataset (each call adds a backup).
    #[tool(name = "reset_to_original")]
    async fn reset_to_original(&self) -> Result<Json<ResetResponse>, String> {
        tools::reset::execute(&self.store)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Get a one-row CSV template with the required column layout.
    #[tool(name = "download_template")]
    async fn download_template(&self) -> Result<Json<CsvDownloadResponse>, String> {
        tools::download::template()
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Export the dataset (optionally filtered) as CSV in the persisted layout.
    ///
    /// The suggested file name is `financial_data_<YYYYMMDD>.csv`.
    #[tool(name = "export_data")]
    async fn export_data(
        &self,
        Parameters(params): Parameters<FilterParams>,
    ) -> Result<Json<CsvDownloadResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let filter = params.to_filter()?;
        tools::download::export(&self.store, &filter)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Headline KPIs over each company's latest quarter, plus market cap shares.
    ///
    /// **Output**: total revenue, net income and market cap (millions USD),
    ///   average P/E over companies where it is defined, latest rows per company
    #[tool(name = "dashboard_summary")]
    async fn dashboard_summary(
        &self,
        Parameters(params): Parameters<FilterParams>,
    ) -> Result<Json<DashboardSummaryResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let filter = params.to_filter()?;
        tools::dashboard::summary(&self.store, &filter)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Per-company time series of one metric, sorted by date.
    ///
    /// Undefined P/E values are left out of the PERatio series.
    #[tool(name = "metric_series")]
    async fn metric_series(
        &self,
        Parameters(params): Parameters<MetricSeriesParams>,
    ) -> Result<Json<MetricSeriesResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let filter = params.filter.to_filter()?;
        tools::dashboard::series(&self.store, &filter, params.metric)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }

    /// Year-over-year revenue growth per company.
    ///
    /// Quarterly revenue is summed per calendar year. A year gets a growth value
    /// only when the previous year exists and its total is positive.
    #[tool(name = "yoy_growth")]
    async fn yoy_growth(
        &self,
        Parameters(params): Parameters<FilterParams>,
    ) -> Result<Json<GrowthResponse>, String> {
        params
            .validate()
            .map_err(|e| format!("Validation error: {e}"))?;
        let filter = params.to_filter()?;
        tools::dashboard::growth(&self.store, &filter)
            .map(Json)
            .map_err(|e| format!("Error: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for FinboardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "finboard-mcp".into(),
                title: None,
                version: env!("CARGO_PKG_VERSION").into(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Quarterly financial dataset for a company dashboard (amounts in millions USD). \
                \n\nTypical workflow:\
                \n1. load_dataset({ companies?, start_date?, end_date?, limit? }) or \
                dataset_status() to see what is stored.\
                \n2. dashboard_summary / metric_series({ metric }) / yoy_growth to analyze.\
                \n3. download_template() for the upload layout, then validate_upload({ file_name, \
                content, content_encoding? }) to check a file.\
                \n4. import_data({ file_name, content, mode: \"append\" | \"replace\" }) to store it; \
                the previous file is backed up first.\
                \n5. export_data() to download CSV, reset_to_original() to restore the sample."
                    .into(),
            ),
        }
    }
}
