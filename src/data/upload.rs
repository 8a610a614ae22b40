use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Reader};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use super::error::{PipelineError, PipelineResult};
use super::schema::DATE_FORMAT;

/// Tabular file formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Spreadsheet,
}

impl UploadFormat {
    /// Resolve the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> PipelineResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(UploadFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(UploadFormat::Spreadsheet),
            _ => Err(PipelineError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// An uploaded table before validation: every cell is text (or missing).
///
/// Backed by a `DataFrame` whose columns are all `String`, so the validator
/// and normalizer see exactly what the operator wrote.
#[derive(Debug, Clone)]
pub struct RawTable {
    df: DataFrame,
}

impl RawTable {
    /// Wrap an arbitrary `DataFrame`, casting every column to text.
    pub fn from_dataframe(df: DataFrame) -> PipelineResult<Self> {
        let columns = df
            .columns()
            .iter()
            .map(|c| c.cast(&DataType::String))
            .collect::<PolarsResult<Vec<Column>>>()?;
        Ok(Self {
            df: DataFrame::new(df.height(), columns)?,
        })
    }

    /// Parse an upload, picking the reader from the file name.
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> PipelineResult<Self> {
        match UploadFormat::from_file_name(file_name)? {
            UploadFormat::Csv => Self::from_csv_bytes(bytes),
            UploadFormat::Spreadsheet => Self::from_spreadsheet_bytes(bytes),
        }
    }

    /// Read comma-delimited text with a header row. No type inference is done.
    pub fn from_csv_bytes(bytes: &[u8]) -> PipelineResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(PipelineError::Parse {
                field: "file".to_string(),
                message: "file is empty".to_string(),
            });
        }
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()
            .map_err(|e| PipelineError::Parse {
                field: "file".to_string(),
                message: e.to_string(),
            })?;
        Self::from_dataframe(df)
    }

    /// Read the first worksheet of a spreadsheet; its first row is the header.
    pub fn from_spreadsheet_bytes(bytes: &[u8]) -> PipelineResult<Self> {
        let spreadsheet_error = |message: String| PipelineError::Parse {
            field: "file".to_string(),
            message,
        };

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| spreadsheet_error(e.to_string()))?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| spreadsheet_error("workbook has no worksheets".to_string()))?;
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| spreadsheet_error(e.to_string()))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Err(spreadsheet_error(format!("worksheet '{sheet_name}' is empty")));
        };
        let headers: Vec<Option<String>> = header_row.iter().map(cell_text).collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut height = 0;
        for row in rows {
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            for (idx, column) in cells.iter_mut().enumerate() {
                column.push(row.get(idx).and_then(cell_text));
            }
            height += 1;
        }

        // Unnamed and repeated headers are dropped; the first occurrence wins.
        let mut seen = HashSet::new();
        let columns: Vec<Column> = headers
            .into_iter()
            .zip(cells)
            .filter_map(|(name, values)| {
                let name = name?;
                seen.insert(name.clone())
                    .then(|| Column::new(name.as_str().into(), values))
            })
            .collect();

        Ok(Self {
            df: DataFrame::new(height, columns)?,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.schema().contains(name)
    }

    /// Cell values of one column, top to bottom. Blank cells read as `None`.
    pub fn values(&self, name: &str) -> PipelineResult<Vec<Option<&str>>> {
        if !self.has_column(name) {
            return Err(PipelineError::Schema(vec![name.to_string()]));
        }
        let ca = self.df.column(name)?.str()?;
        Ok(ca
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
            .collect())
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => date.format(DATE_FORMAT).to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            UploadFormat::from_file_name("q1.csv").unwrap(),
            UploadFormat::Csv
        );
        assert_eq!(
            UploadFormat::from_file_name("Q1.XLSX").unwrap(),
            UploadFormat::Spreadsheet
        );
        assert_eq!(
            UploadFormat::from_file_name("data.ods").unwrap(),
            UploadFormat::Spreadsheet
        );
    }

    #[test]
    fn unsupported_extension_rejected() {
        for name in ["data.json", "data", "archive.csv.zip"] {
            let err = UploadFormat::from_file_name(name).unwrap_err();
            assert!(matches!(err, PipelineError::UnsupportedFormat(_)), "{name}");
        }
    }

    #[test]
    fn csv_cells_stay_text() {
        let bytes = b"Date,Company,Revenue\n2020-03-31,Meta,17737\n2020-06-30,Meta,\n";
        let table = RawTable::from_csv_bytes(bytes).unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.column_names(), vec!["Date", "Company", "Revenue"]);
        assert_eq!(
            table.values("Revenue").unwrap(),
            vec![Some("17737"), None]
        );
        assert_eq!(
            table.values("Date").unwrap(),
            vec![Some("2020-03-31"), Some("2020-06-30")]
        );
    }

    #[test]
    fn csv_header_only_is_empty_table() {
        let table = RawTable::from_csv_bytes(b"Date,Company\n").unwrap();
        assert_eq!(table.height(), 0);
        assert!(table.has_column("Company"));
    }

    #[test]
    fn blank_csv_is_parse_error() {
        let err = RawTable::from_csv_bytes(b"  \n").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn from_dataframe_casts_numbers_to_text() {
        let df = df! {
            "Revenue" => &[17737i64, 18687],
            "StockPrice" => &[165.91, 227.07],
        }
        .unwrap();
        let table = RawTable::from_dataframe(df).unwrap();
        assert_eq!(
            table.values("Revenue").unwrap(),
            vec![Some("17737"), Some("18687")]
        );
        assert_eq!(table.values("StockPrice").unwrap()[0], Some("165.91"));
    }

    #[test]
    fn xlsx_upload_matches_csv_equivalent() {
        use crate::data::normalize::normalize;
        use crate::data::validator::validate;
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let headers = [
            "Date",
            "Company",
            "Revenue",
            "NetIncome",
            "OperatingExpenses",
            "MarketCap",
            "StockPrice",
            "PERatio",
        ];
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2020, 3, 31).unwrap();
        sheet
            .write_datetime_with_format(1, 0, &date, &date_format)
            .unwrap();
        sheet.write_string(1, 1, "Meta").unwrap();
        for (col, value) in [17737.0, 4902.0, 12835.0, 585_000.0, 165.91, 26.5]
            .into_iter()
            .enumerate()
        {
            sheet.write_number(1, col as u16 + 2, value).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let from_xlsx = RawTable::from_upload("q1.xlsx", &bytes).unwrap();
        assert_eq!(from_xlsx.height(), 1);
        assert_eq!(from_xlsx.values("Date").unwrap(), vec![Some("2020-03-31")]);
        assert!(validate(&from_xlsx).is_empty());

        let csv = format!(
            "{}\n2020-03-31,Meta,17737,4902,12835,585000,165.91,26.5\n",
            headers.join(",")
        );
        let from_csv = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(normalize(&from_xlsx).unwrap(), normalize(&from_csv).unwrap());
    }

    #[test]
    fn garbage_spreadsheet_is_parse_error() {
        let err = RawTable::from_spreadsheet_bytes(b"not a workbook").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }
}
