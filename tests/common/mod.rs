#![allow(dead_code)]

use chrono::NaiveDate;
use tempfile::TempDir;

use finboard_mcp::data::schema::Record;
use finboard_mcp::data::store::DatasetStore;
use finboard_mcp::data::upload::RawTable;

pub const HEADER: &str =
    "Date,Company,Revenue,NetIncome,OperatingExpenses,MarketCap,StockPrice,PERatio";

/// The first row of the bundled sample, as uploaded text.
pub const META_Q1_2020: &str = "2020-03-31,Meta,17737,4902,12835,585000,165.91,26.5";

/// CSV text with the full header followed by `rows`.
pub fn csv_with_rows(rows: &[&str]) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    csv
}

pub fn raw_table(csv: &str) -> RawTable {
    RawTable::from_csv_bytes(csv.as_bytes()).unwrap()
}

/// A store rooted in a fresh temp directory. No file is written yet.
pub fn temp_store() -> (DatasetStore, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = DatasetStore::new(
        tmp.path().join("financial_data.csv"),
        tmp.path().join("backups"),
    );
    (store, tmp)
}

/// A temp store seeded with the bundled sample.
pub fn seeded_store() -> (DatasetStore, TempDir) {
    let (store, tmp) = temp_store();
    store.ensure_initialized().unwrap();
    (store, tmp)
}

/// One quarter for `company` with revenue-derived figures.
pub fn record(company: &str, y: i32, m: u32, d: u32, revenue: i64) -> Record {
    Record::new(
        NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        company,
        revenue,
        revenue / 5,
        revenue - revenue / 5,
        revenue * 10,
        42.5,
        Some(18.0),
    )
}
