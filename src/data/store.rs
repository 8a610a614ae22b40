use polars::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::error::{PipelineError, PipelineResult};
use super::normalize::normalize;
use super::schema::{
    Dataset, Record, COMPANY_COL, DATE_COL, DATE_FORMAT, MARKET_CAP_COL, NET_INCOME_COL,
    OPERATING_EXPENSES_COL, PE_RATIO_COL, REVENUE_COL, STOCK_PRICE_COL,
};
use super::upload::RawTable;
use super::validator::validate;

/// The dataset shipped with the service; `reset_to_original` restores it.
const SAMPLE_CSV: &str = include_str!("../../assets/sample_financial_data.csv");

/// Timestamp layout embedded in backup file names.
const BACKUP_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Result of a successful `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub path: PathBuf,
    pub rows: usize,
    /// Where the previous file content was copied, if a backup was taken.
    pub backup: Option<PathBuf>,
}

/// Snapshot of the persisted dataset file, for status displays.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreStatus {
    pub exists: bool,
    pub file_path: String,
    pub rows: Option<usize>,
    pub last_updated: Option<String>,
    pub backup_dir: String,
    pub backups: usize,
    pub original_backup_exists: bool,
}

/// Owner of the persisted dataset file and its backups.
///
/// Constructed once and shared. Reads go through an explicit cache that every
/// write invalidates, so a caller always observes its own saves. Writes within
/// the process are serialized; other processes are not locked out.
pub struct DatasetStore {
    data_file: PathBuf,
    backup_dir: PathBuf,
    cache: RwLock<Option<Arc<Dataset>>>,
    writer: Mutex<()>,
}

impl DatasetStore {
    pub fn new(data_file: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            data_file,
            backup_dir,
            cache: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Current dataset, read from disk on the first call after an invalidation.
    pub fn load(&self) -> PipelineResult<Arc<Dataset>> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(cached));
        }

        if !self.data_file.exists() {
            return Err(PipelineError::NotFound(self.data_file.clone()));
        }
        let bytes = std::fs::read(&self.data_file)
            .map_err(|e| PipelineError::io(&self.data_file, e))?;
        let dataset = Arc::new(decode_csv(&bytes).map_err(|message| {
            PipelineError::Corruption {
                path: self.data_file.clone(),
                message,
            }
        })?);
        tracing::debug!(path = %self.data_file.display(), rows = dataset.len(), "Loaded dataset");

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop the cached dataset so the next `load` reads the file again.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!(path = %self.data_file.display(), "Invalidated dataset cache");
    }

    /// Persist `dataset` as the current file.
    ///
    /// With `backup` set and a prior file present, the prior bytes are first
    /// copied to a new timestamped file under the backup directory. The new
    /// content is written next to the primary file and renamed over it, so a
    /// failed write leaves the primary untouched.
    pub fn save(&self, dataset: &[Record], backup: bool) -> PipelineResult<SaveOutcome> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = self.save_locked(dataset, backup);
        self.invalidate();
        outcome
    }

    fn save_locked(&self, dataset: &[Record], backup: bool) -> PipelineResult<SaveOutcome> {
        let backup_path = if backup && self.data_file.exists() {
            Some(self.take_backup()?)
        } else {
            None
        };

        if let Some(parent) = self.data_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }

        let bytes = encode_csv(dataset)?;
        let tmp_path = self.data_file.with_extension("csv.tmp");
        std::fs::write(&tmp_path, &bytes).map_err(|e| PipelineError::io(&tmp_path, e))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.data_file) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(PipelineError::io(&self.data_file, e));
        }

        tracing::info!(
            path = %self.data_file.display(),
            rows = dataset.len(),
            backup = ?backup_path,
            "Saved dataset"
        );

        Ok(SaveOutcome {
            path: self.data_file.clone(),
            rows: dataset.len(),
            backup: backup_path,
        })
    }

    /// Copy the current file's raw bytes to `<stem>_backup_<timestamp>.csv`.
    ///
    /// Two backups in the same second get `_1`, `_2`, ... suffixes instead of
    /// overwriting each other.
    fn take_backup(&self) -> PipelineResult<PathBuf> {
        let prior = std::fs::read(&self.data_file)
            .map_err(|e| PipelineError::io(&self.data_file, e))?;
        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| PipelineError::io(&self.backup_dir, e))?;

        let stamp = chrono::Local::now().format(BACKUP_TIMESTAMP).to_string();
        let base = format!("{}_backup_{stamp}", self.file_stem());
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{base}.csv")
            } else {
                format!("{base}_{attempt}.csv")
            };
            let path = self.backup_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&prior)
                        .map_err(|e| PipelineError::io(&path, e))?;
                    tracing::info!(backup = %path.display(), "Backed up dataset");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(PipelineError::io(&path, e)),
            }
        }
    }

    /// Restore the shipped sample as the current dataset.
    ///
    /// The sample is first written to `<stem>_original.csv` in the backup
    /// directory unless that file already exists; the prior current file is
    /// backed up like any other save. Repeated calls leave the same dataset.
    pub fn reset_to_original(&self) -> PipelineResult<SaveOutcome> {
        let original = sample_dataset()?;
        let original_path = self.original_backup_path();
        if !original_path.exists() {
            std::fs::create_dir_all(&self.backup_dir)
                .map_err(|e| PipelineError::io(&self.backup_dir, e))?;
            std::fs::write(&original_path, SAMPLE_CSV)
                .map_err(|e| PipelineError::io(&original_path, e))?;
            tracing::info!(path = %original_path.display(), "Materialized original sample backup");
        }
        let outcome = self.save(&original, true)?;
        tracing::info!(rows = outcome.rows, "Reset dataset to original sample");
        Ok(outcome)
    }

    /// Seed the data file from the shipped sample if it does not exist yet.
    /// Returns whether a file was written.
    pub fn ensure_initialized(&self) -> PipelineResult<bool> {
        if self.data_file.exists() {
            return Ok(false);
        }
        let sample = sample_dataset()?;
        self.save(&sample, false)?;
        tracing::info!(path = %self.data_file.display(), "Initialized dataset from sample");
        Ok(true)
    }

    /// Backup files taken before saves, newest first. The original-sample
    /// backup is not included.
    pub fn list_backups(&self) -> PipelineResult<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(vec![]);
        }
        let prefix = format!("{}_backup_", self.file_stem());
        let entries = std::fs::read_dir(&self.backup_dir)
            .map_err(|e| PipelineError::io(&self.backup_dir, e))?;

        let mut backups = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::io(&self.backup_dir, e))?.path();
            let is_backup = path.extension().is_some_and(|e| e == "csv")
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(&prefix));
            if is_backup {
                backups.push(path);
            }
        }
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    pub fn status(&self) -> PipelineResult<StoreStatus> {
        let exists = self.data_file.exists();
        let (rows, last_updated) = if exists {
            let metadata = std::fs::metadata(&self.data_file)
                .map_err(|e| PipelineError::io(&self.data_file, e))?;
            let modified = metadata
                .modified()
                .map_err(|e| PipelineError::io(&self.data_file, e))?;
            let datetime: chrono::DateTime<chrono::Utc> = modified.into();
            (
                self.load().ok().map(|d| d.len()),
                Some(datetime.to_rfc3339()),
            )
        } else {
            (None, None)
        };

        Ok(StoreStatus {
            exists,
            file_path: self.data_file.display().to_string(),
            rows,
            last_updated,
            backup_dir: self.backup_dir.display().to_string(),
            backups: self.list_backups()?.len(),
            original_backup_exists: self.original_backup_path().exists(),
        })
    }

    pub fn original_backup_path(&self) -> PathBuf {
        self.backup_dir
            .join(format!("{}_original.csv", self.file_stem()))
    }

    fn file_stem(&self) -> String {
        self.data_file
            .file_stem()
            .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().to_string())
    }
}

/// The dataset shipped with the service.
pub fn sample_dataset() -> PipelineResult<Dataset> {
    decode_csv(SAMPLE_CSV.as_bytes()).map_err(|message| PipelineError::Corruption {
        path: PathBuf::from("assets/sample_financial_data.csv"),
        message,
    })
}

/// A one-row CSV in the persisted layout, offered to guide uploads.
pub fn template_csv() -> PipelineResult<String> {
    let example = Record::new(
        chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap_or_default(),
        "Example Corp",
        50_000,
        10_000,
        40_000,
        800_000,
        150.25,
        Some(25.5),
    );
    let bytes = encode_csv(std::slice::from_ref(&example))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serialize records in the persisted CSV layout. Derived fields are dropped;
/// `StockPrice` keeps two decimals and an undefined P/E is an empty cell.
pub fn encode_csv(dataset: &[Record]) -> PipelineResult<Vec<u8>> {
    let dates: Vec<String> = dataset
        .iter()
        .map(|r| r.date.format(DATE_FORMAT).to_string())
        .collect();
    let companies: Vec<&str> = dataset.iter().map(|r| r.company.as_str()).collect();
    let revenue: Vec<i64> = dataset.iter().map(|r| r.revenue).collect();
    let net_income: Vec<i64> = dataset.iter().map(|r| r.net_income).collect();
    let opex: Vec<i64> = dataset.iter().map(|r| r.operating_expenses).collect();
    let market_cap: Vec<i64> = dataset.iter().map(|r| r.market_cap).collect();
    let stock_price: Vec<String> = dataset
        .iter()
        .map(|r| format!("{:.2}", r.stock_price))
        .collect();
    let pe_ratio: Vec<Option<String>> = dataset
        .iter()
        .map(|r| r.pe_ratio.map(|v| v.to_string()))
        .collect();

    let mut df = df! {
        DATE_COL => dates,
        COMPANY_COL => companies,
        REVENUE_COL => revenue,
        NET_INCOME_COL => net_income,
        OPERATING_EXPENSES_COL => opex,
        MARKET_CAP_COL => market_cap,
        STOCK_PRICE_COL => stock_price,
        PE_RATIO_COL => pe_ratio,
    }?;

    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buf)
}

/// Parse persisted CSV bytes back into records. The error is a description
/// of why the content does not match the schema.
fn decode_csv(bytes: &[u8]) -> Result<Dataset, String> {
    let raw = RawTable::from_csv_bytes(bytes).map_err(|e| e.to_string())?;
    let defects = validate(&raw);
    if !defects.is_empty() {
        let messages: Vec<String> = defects.iter().map(ToString::to_string).collect();
        return Err(messages.join("; "));
    }
    normalize(&raw).map_err(|e| e.to_string())
}
