//! Feature extraction from request payloads
//!
//! Turns the JSON body of a prediction request into a `FeatureVector`,
//! validating the five stock prices and resolving the date either from a
//! `date` string or from explicit `day` / `month` / `year` components.

use crate::error::PredictError;
use crate::models::{FeatureVector, StockPrices};
use crate::schema::{DAY_COLUMN, MONTH_COLUMN, STOCK_COLUMNS, TARGET_COLUMN};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::{Map, Value};

/// Request key holding an ISO date
pub const DATE_KEY: &str = "date";

/// Accepted layout of the `date` field
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Extracts validated features from raw request input
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    fixed_today: Option<NaiveDate>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self { fixed_today: None }
    }

    /// Use a fixed date for defaulted date components
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            fixed_today: Some(today),
        }
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn extract(&self, input: &Map<String, Value>) -> Result<FeatureVector, PredictError> {
        let prices = extract_prices(input)?;

        if let Some(value) = input.get(DATE_KEY) {
            let date = parse_request_date(value)?;
            return Ok(FeatureVector::from_date(prices, date));
        }

        let today = self.today();
        let day = match input.get(DAY_COLUMN) {
            Some(v) => coerce_int(DAY_COLUMN, v)?,
            None => today.day() as i64,
        };
        let month = match input.get(MONTH_COLUMN) {
            Some(v) => coerce_int(MONTH_COLUMN, v)?,
            None => today.month() as i64,
        };
        let year = match input.get(TARGET_COLUMN) {
            Some(v) => coerce_int(TARGET_COLUMN, v)?,
            None => today.year() as i64,
        };

        if !(1..=31).contains(&day) {
            return Err(PredictError::validation(format!(
                "Invalid day: {} (expected 1-31)",
                day
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(PredictError::validation(format!(
                "Invalid month: {} (expected 1-12)",
                month
            )));
        }
        let year = i32::try_from(year)
            .map_err(|_| PredictError::validation(format!("Invalid year: {}", year)))?;

        Ok(FeatureVector {
            prices,
            day: day as u32,
            month: month as u32,
            year,
        })
    }
}

fn extract_prices(input: &Map<String, Value>) -> Result<StockPrices, PredictError> {
    let mut prices = StockPrices {
        msft: 0.0,
        ibm: 0.0,
        sbux: 0.0,
        aapl: 0.0,
        gspc: 0.0,
    };

    for symbol in STOCK_COLUMNS {
        let value = input.get(symbol).ok_or_else(|| {
            PredictError::validation(format!("Missing required feature: {}", symbol))
        })?;
        prices.set(symbol, coerce_price(symbol, value)?);
    }

    Ok(prices)
}

fn coerce_price(key: &str, value: &Value) -> Result<f64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(PredictError::validation(format!(
            "Invalid value for {}: expected a number, got {}",
            key, value
        ))),
    }
}

fn coerce_int(key: &str, value: &Value) -> Result<i64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        PredictError::validation(format!(
            "Invalid value for {}: expected an integer, got {}",
            key, value
        ))
    })
}

fn parse_request_date(value: &Value) -> Result<NaiveDate, PredictError> {
    let text = value.as_str().ok_or_else(|| {
        PredictError::validation(format!(
            "Invalid date: expected a string in YYYY-MM-DD format, got {}",
            value
        ))
    })?;

    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| {
        PredictError::validation(format!(
            "Invalid date '{}': expected YYYY-MM-DD",
            text
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::with_today(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
    }

    #[test]
    fn test_extracts_prices_and_date() {
        let input = payload(json!({
            "MSFT": 150.0, "IBM": 120.0, "SBUX": 80.0, "AAPL": 300.0, "GSPC": 3800.0,
            "date": "2021-06-15"
        }));
        let f = extractor().extract(&input).unwrap();
        assert_eq!(f.prices.msft, 150.0);
        assert_eq!(f.prices.gspc, 3800.0);
        assert_eq!((f.day, f.month, f.year), (15, 6, 2021));
    }

    #[test]
    fn test_missing_feature_is_named() {
        let input = payload(json!({"MSFT": 100.0}));
        let err = extractor().extract(&input).unwrap_err();
        assert_eq!(
            err,
            PredictError::Validation("Missing required feature: IBM".to_string())
        );

        for missing in STOCK_COLUMNS {
            let mut full = payload(json!({
                "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
                "date": "2021-06-15"
            }));
            full.remove(missing);
            let err = extractor().extract(&full).unwrap_err();
            assert!(err.to_string().contains(missing), "{}", err);
        }
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let input = payload(json!({
            "MSFT": "150.5", "IBM": " 120 ", "SBUX": 80, "AAPL": 300.0, "GSPC": "3800",
            "date": "2021-06-15"
        }));
        let f = extractor().extract(&input).unwrap();
        assert_eq!(f.prices.msft, 150.5);
        assert_eq!(f.prices.ibm, 120.0);
        assert_eq!(f.prices.sbux, 80.0);
    }

    #[test]
    fn test_non_numeric_price_rejected() {
        for bad in [json!("abc"), json!(null), json!(true), json!([1.0]), json!("NaN")] {
            let input = payload(json!({
                "MSFT": 1.0, "IBM": bad, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
                "date": "2021-06-15"
            }));
            let err = extractor().extract(&input).unwrap_err();
            assert!(matches!(err, PredictError::Validation(ref m) if m.contains("IBM")));
        }
    }

    #[test]
    fn test_leap_day_parses_and_invalid_day_fails() {
        let mut input = payload(json!({
            "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
            "date": "2020-02-29"
        }));
        let f = extractor().extract(&input).unwrap();
        assert_eq!((f.day, f.month, f.year), (29, 2, 2020));

        input.insert("date".into(), json!("2020-02-30"));
        let err = extractor().extract(&input).unwrap_err();
        assert!(matches!(err, PredictError::Validation(ref m) if m.contains("2020-02-30")));

        input.insert("date".into(), json!("15/06/2021"));
        assert!(extractor().extract(&input).is_err());

        input.insert("date".into(), json!(20210615));
        assert!(extractor().extract(&input).is_err());
    }

    #[test]
    fn test_explicit_date_components() {
        let input = payload(json!({
            "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
            "day": 5, "month": "11", "year": 2019.0
        }));
        let f = extractor().extract(&input).unwrap();
        assert_eq!((f.day, f.month, f.year), (5, 11, 2019));
    }

    #[test]
    fn test_missing_components_default_to_today() {
        let input = payload(json!({
            "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
            "month": 7
        }));
        let f = extractor().extract(&input).unwrap();
        assert_eq!((f.day, f.month, f.year), (9, 7, 2024));
    }

    #[test]
    fn test_out_of_range_components_rejected() {
        let input = payload(json!({
            "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
            "day": 40
        }));
        assert!(extractor().extract(&input).is_err());

        let input = payload(json!({
            "MSFT": 1.0, "IBM": 1.0, "SBUX": 1.0, "AAPL": 1.0, "GSPC": 1.0,
            "month": "twelve"
        }));
        let err = extractor().extract(&input).unwrap_err();
        assert!(err.to_string().contains("month"));
    }
}
