use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::data::store::DatasetStore;

const DEFAULT_CONFIG_FILE: &str = "finboard.toml";
const DEFAULT_DATA_ROOT: &str = "data";
const DEFAULT_DATASET_FILE: &str = "financial_data.csv";

/// Optional TOML overrides; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_root: Option<PathBuf>,
    dataset_file: Option<String>,
    backup_dir: Option<PathBuf>,
    port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_root: PathBuf,
    pub dataset_file: String,
    pub backup_dir: PathBuf,
    /// Serve streamable HTTP on this port instead of stdio.
    pub port: Option<u16>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_root = PathBuf::from(DEFAULT_DATA_ROOT);
        Self {
            backup_dir: data_root.join("backups"),
            data_root,
            dataset_file: DEFAULT_DATASET_FILE.to_string(),
            port: None,
        }
    }
}

impl AppConfig {
    /// Build from defaults, then a TOML file, then environment variables.
    ///
    /// | Env Var | Default | Purpose |
    /// |---------|---------|---------|
    /// | `FINBOARD_CONFIG` | `finboard.toml` (if present) | TOML config path |
    /// | `DATA_ROOT` | `data` | Directory holding the dataset file |
    /// | `DATASET_FILE` | `financial_data.csv` | Dataset file name |
    /// | `BACKUP_DIR` | `<DATA_ROOT>/backups` | Backup directory |
    /// | `PORT` | (none) | Serve HTTP instead of stdio |
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match std::env::var("FINBOARD_CONFIG") {
            Ok(path) => Some(read_file_config(Path::new(&path))?),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Some(read_file_config(Path::new(DEFAULT_CONFIG_FILE))?)
            }
            Err(_) => None,
        };

        Self::resolve(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_root = env("DATA_ROOT")
            .map(PathBuf::from)
            .or(file.data_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));
        let dataset_file = env("DATASET_FILE")
            .or(file.dataset_file)
            .unwrap_or_else(|| DEFAULT_DATASET_FILE.to_string());
        let backup_dir = env("BACKUP_DIR")
            .map(PathBuf::from)
            .or(file.backup_dir)
            .unwrap_or_else(|| data_root.join("backups"));
        let port = match env("PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("Invalid PORT value: {raw}"))?,
            ),
            None => file.port,
        };

        validate_dataset_file(&dataset_file)?;

        Ok(Self {
            data_root,
            dataset_file,
            backup_dir,
            port,
        })
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_root.join(&self.dataset_file)
    }

    pub fn build_store(&self) -> DatasetStore {
        DatasetStore::new(self.data_file(), self.backup_dir.clone())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// The dataset file name must be a bare `.csv` file name.
fn validate_dataset_file(name: &str) -> Result<()> {
    let path = Path::new(name);
    let bare = path.components().count() == 1
        && matches!(path.components().next(), Some(std::path::Component::Normal(_)));
    if !bare || !name.ends_with(".csv") {
        anyhow::bail!("DATASET_FILE must be a plain .csv file name, got: {name}");
    }
    Ok(())
}
