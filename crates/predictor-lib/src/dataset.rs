//! Historical dataset loading
//!
//! Reads the CSV the model was trained on, drops incomplete rows and derives
//! the `day` / `month` / `year` columns so the scaler can be refit exactly as
//! it was at training time.

use crate::models::{HistoricalRecord, StockPrices};
use crate::scaler::{ScalerError, StandardScaler};
use crate::schema::{FeatureSchema, DAY_COLUMN, MONTH_COLUMN, TARGET_COLUMN};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Name of the date column in the source CSV
pub const DATE_COLUMN: &str = "Date";

/// Date layouts accepted in the `Date` column
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Cleaned historical dataset with the column layout derived from its header
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: FeatureSchema,
    records: Vec<HistoricalRecord>,
    dropped_rows: usize,
}

impl Dataset {
    /// Load the dataset from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open dataset: {:?}", path.as_ref()))?;
        let dataset = Self::from_reader(file)
            .with_context(|| format!("Failed to read dataset: {:?}", path.as_ref()))?;

        info!(
            path = ?path.as_ref(),
            rows = dataset.records.len(),
            dropped_rows = dataset.dropped_rows,
            "Historical dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse the dataset from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        // Short rows are parsed and dropped like rows with empty cells
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers().context("Failed to read CSV header")?.clone();

        let date_idx = headers
            .iter()
            .position(|h| h == DATE_COLUMN)
            .with_context(|| format!("Dataset has no '{}' column", DATE_COLUMN))?;

        // Remaining columns keep their CSV order, followed by the derived date parts
        let price_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let schema = FeatureSchema::new(
            price_columns
                .iter()
                .map(|(_, name)| name.clone())
                .chain([DAY_COLUMN, MONTH_COLUMN, TARGET_COLUMN].map(String::from)),
        )
        .context("Dataset columns do not match the expected feature set")?;

        let mut records = Vec::new();
        let mut dropped_rows = 0;

        for (line, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Malformed CSV row {}", line + 2))?;
            match parse_record(&record, date_idx, &price_columns) {
                Some(parsed) => records.push(parsed),
                None => {
                    debug!(row = line + 2, "Dropping incomplete dataset row");
                    dropped_rows += 1;
                }
            }
        }

        Ok(Self {
            schema,
            records,
            dropped_rows,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows skipped because of a missing or unparseable value
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Full-width rows (including the real `year`) in schema order
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.records
            .iter()
            .map(|r| r.features().to_row(&self.schema))
            .collect()
    }

    /// Fit a standardization scaler on every column of the dataset
    pub fn fit_scaler(&self) -> Result<StandardScaler, ScalerError> {
        StandardScaler::fit(self.schema.clone(), &self.rows())
    }
}

fn parse_record(
    record: &StringRecord,
    date_idx: usize,
    price_columns: &[(usize, String)],
) -> Option<HistoricalRecord> {
    let date = parse_date(record.get(date_idx)?)?;

    let mut prices = StockPrices {
        msft: 0.0,
        ibm: 0.0,
        sbux: 0.0,
        aapl: 0.0,
        gspc: 0.0,
    };
    for (idx, name) in price_columns {
        let value: f64 = record.get(*idx)?.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        prices.set(name, value);
    }

    Some(HistoricalRecord { date, prices })
}

/// Parse a dataset date, accepting plain dates and timestamps
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_CSV: &str = "\
Date,MSFT,IBM,SBUX,AAPL,GSPC
2018-01-02,85.95,154.25,59.45,172.26,2695.81
2018-01-03,86.35,158.49,60.21,172.23,
2019-06-14,132.45,135.55,82.64,192.74,2886.98
2020-02-28,162.01,130.15,73.64,273.36,2954.22
not-a-date,1.0,1.0,1.0,1.0,1.0
2021-06-15 00:00:00,257.38,146.29,112.84,129.64,4246.59
";

    #[test]
    fn test_loads_and_drops_incomplete_rows() {
        let dataset = Dataset::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.dropped_rows(), 2);
        assert_eq!(
            dataset.records()[3].date,
            NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
        );
    }

    #[test]
    fn test_short_rows_are_dropped() {
        let csv = "Date,MSFT,IBM,SBUX,AAPL,GSPC\n\
                   2018-01-02,1,2,3,4,5\n\
                   2018-01-03,1,2\n\
                   2019-01-02,2,3,4,5,6\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dropped_rows(), 1);
        assert_eq!(dataset.records()[1].prices.gspc, 6.0);
    }

    #[test]
    fn test_schema_follows_csv_header_order() {
        let csv = "Date,AAPL,MSFT,IBM,SBUX,GSPC\n2020-01-02,1,2,3,4,5\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            dataset.schema().columns(),
            &["AAPL", "MSFT", "IBM", "SBUX", "GSPC", "day", "month", "year"]
        );
        assert_eq!(dataset.records()[0].prices.aapl, 1.0);
        assert_eq!(dataset.rows()[0], vec![1.0, 2.0, 3.0, 4.0, 5.0, 2.0, 1.0, 2020.0]);
    }

    #[test]
    fn test_rejects_unexpected_columns() {
        let csv = "Date,MSFT,IBM,SBUX,AAPL,GSPC,TSLA\n2020-01-02,1,2,3,4,5,6\n";
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());

        let no_date = "MSFT,IBM,SBUX,AAPL,GSPC\n1,2,3,4,5\n";
        assert!(Dataset::from_reader(no_date.as_bytes()).is_err());
    }

    #[test]
    fn test_fit_scaler_uses_real_years() {
        let dataset = Dataset::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let scaler = dataset.fit_scaler().unwrap();
        // years 2018, 2019, 2020, 2021
        assert!((scaler.mean()[7] - 2019.5).abs() < 1e-9);
        assert_eq!(scaler.n_samples_seen(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 4);

        assert!(Dataset::load("/nonexistent/stockdata.csv").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 2, 29);
        assert_eq!(parse_date("2020-02-29"), expected);
        assert_eq!(parse_date("02/29/2020"), expected);
        assert_eq!(parse_date("2020-02-29 16:00:00"), expected);
        assert_eq!(parse_date("2020-02-30"), None);
        assert_eq!(parse_date(""), None);
    }
}
