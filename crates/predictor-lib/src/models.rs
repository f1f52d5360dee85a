//! Core data models for the predictor

use crate::schema::{FeatureSchema, DAY_COLUMN, MONTH_COLUMN, TARGET_COLUMN};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Closing prices for the five tracked symbols
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockPrices {
    #[serde(rename = "MSFT")]
    pub msft: f64,
    #[serde(rename = "IBM")]
    pub ibm: f64,
    #[serde(rename = "SBUX")]
    pub sbux: f64,
    #[serde(rename = "AAPL")]
    pub aapl: f64,
    #[serde(rename = "GSPC")]
    pub gspc: f64,
}

impl StockPrices {
    /// Look up a price by ticker symbol
    pub fn get(&self, symbol: &str) -> Option<f64> {
        match symbol {
            "MSFT" => Some(self.msft),
            "IBM" => Some(self.ibm),
            "SBUX" => Some(self.sbux),
            "AAPL" => Some(self.aapl),
            "GSPC" => Some(self.gspc),
            _ => None,
        }
    }

    /// Set a price by ticker symbol, returning false for unknown symbols
    pub fn set(&mut self, symbol: &str, value: f64) -> bool {
        let slot = match symbol {
            "MSFT" => &mut self.msft,
            "IBM" => &mut self.ibm,
            "SBUX" => &mut self.sbux,
            "AAPL" => &mut self.aapl,
            "GSPC" => &mut self.gspc,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Named model inputs for a single prediction
///
/// `year` is carried only so the row has the scaler's fitted width; it is
/// the value being predicted and is replaced by a placeholder before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(flatten)]
    pub prices: StockPrices,
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl FeatureVector {
    pub fn from_date(prices: StockPrices, date: NaiveDate) -> Self {
        Self {
            prices,
            day: date.day(),
            month: date.month(),
            year: date.year(),
        }
    }

    /// Value of a schema column by name
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            DAY_COLUMN => Some(self.day as f64),
            MONTH_COLUMN => Some(self.month as f64),
            TARGET_COLUMN => Some(self.year as f64),
            symbol => self.prices.get(symbol),
        }
    }

    /// Full-width row in schema order
    pub fn to_row(&self, schema: &FeatureSchema) -> Vec<f64> {
        schema
            .columns()
            .iter()
            .map(|c| self.value(c).unwrap_or(0.0))
            .collect()
    }
}

/// One cleaned row of the historical dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub prices: StockPrices,
}

impl HistoricalRecord {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_date(self.prices, self.date)
    }
}

/// Static summary of the loaded model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub model_type: String,
    pub parameters: serde_json::Value,
    pub n_features: Option<usize>,
    pub n_estimators: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> StockPrices {
        StockPrices {
            msft: 150.0,
            ibm: 120.0,
            sbux: 80.0,
            aapl: 300.0,
            gspc: 3800.0,
        }
    }

    #[test]
    fn test_row_follows_schema_order() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
        let features = FeatureVector::from_date(prices(), date);

        let standard = features.to_row(&FeatureSchema::standard());
        assert_eq!(
            standard,
            vec![150.0, 120.0, 80.0, 300.0, 3800.0, 15.0, 6.0, 2021.0]
        );

        let shuffled = FeatureSchema::new([
            "year", "GSPC", "day", "AAPL", "month", "SBUX", "IBM", "MSFT",
        ])
        .unwrap();
        assert_eq!(
            features.to_row(&shuffled),
            vec![2021.0, 3800.0, 15.0, 300.0, 6.0, 80.0, 120.0, 150.0]
        );
    }

    #[test]
    fn test_price_lookup() {
        let mut p = prices();
        assert_eq!(p.get("SBUX"), Some(80.0));
        assert_eq!(p.get("TSLA"), None);
        assert!(p.set("IBM", 99.5));
        assert_eq!(p.ibm, 99.5);
        assert!(!p.set("TSLA", 1.0));
    }

    #[test]
    fn test_feature_vector_serializes_with_ticker_keys() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        let json = serde_json::to_value(FeatureVector::from_date(prices(), date)).unwrap();
        assert_eq!(json["MSFT"], 150.0);
        assert_eq!(json["day"], 29);
        assert_eq!(json["year"], 2020);
    }
}
