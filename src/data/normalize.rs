use super::error::{PipelineError, PipelineResult};
use super::schema::{Dataset, Metric, Record, COMPANY_COL, DATE_COL};
use super::upload::RawTable;
use super::validator::{parse_date, parse_number};

/// Turn a validated raw table into typed records with `year`/`quarter` derived.
///
/// Pure: the same table always yields the same dataset. Monetary fields are
/// rounded to whole millions and stock prices to cents. A table that skipped validation produces a
/// `Parse` error naming the first field that failed.
pub fn normalize(raw: &RawTable) -> PipelineResult<Dataset> {
    let dates = raw.values(DATE_COL)?;
    let companies = raw.values(COMPANY_COL)?;
    let columns = Metric::ALL
        .iter()
        .map(|m| raw.values(m.column()))
        .collect::<PipelineResult<Vec<_>>>()?;

    let mut dataset = Vec::with_capacity(raw.height());
    for row in 0..raw.height() {
        let date = dates[row]
            .and_then(parse_date)
            .ok_or_else(|| parse_error(DATE_COL, row, dates[row]))?;
        let company = companies[row]
            .ok_or_else(|| parse_error(COMPANY_COL, row, None))?
            .to_string();

        let mut values = [None; 6];
        for (slot, (metric, column)) in values.iter_mut().zip(Metric::ALL.iter().zip(&columns)) {
            let cell = column[row];
            *slot = match cell {
                Some(s) => parse_number(s, metric.nullable()),
                None if metric.nullable() => Some(None),
                None => None,
            }
            .ok_or_else(|| parse_error(metric.column(), row, cell))?;
        }

        let [revenue, net_income, operating_expenses, market_cap, stock_price, pe_ratio] = values;
        dataset.push(Record::new(
            date,
            company,
            millions(revenue),
            millions(net_income),
            millions(operating_expenses),
            millions(market_cap),
            cents(stock_price),
            pe_ratio,
        ));
    }

    Ok(dataset)
}

fn millions(value: Option<f64>) -> i64 {
    value.unwrap_or_default().round() as i64
}

/// Stock prices keep two decimals, as persisted.
fn cents(value: Option<f64>) -> f64 {
    (value.unwrap_or_default() * 100.0).round() / 100.0
}

fn parse_error(field: &str, row: usize, cell: Option<&str>) -> PipelineError {
    PipelineError::Parse {
        field: field.to_string(),
        message: format!("row {}: {:?} is not valid", row + 1, cell.unwrap_or("")),
    }
}
