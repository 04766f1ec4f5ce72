// src/roster.rs
use std::collections::BTreeMap;
use std::path::Path;
use crate::utils::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRecord {
    pub ticker: String,
    pub company_name: String,
}

/// Ticker -> company display name, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Roster {
    records: Vec<TickerRecord>,
}

impl Roster {
    pub fn from_pairs<I, T, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: Into<String>,
    {
        let records = pairs
            .into_iter()
            .map(|(ticker, company_name)| TickerRecord {
                ticker: ticker.into(),
                company_name: company_name.into(),
            })
            .collect();
        Self { records }
    }

    /// Loads a JSON object of the form `{"TICKER.NS": "Company Limited", ...}`.
    /// Records are ordered by ticker.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let map: BTreeMap<String, String> = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Invalid roster file {}: {}", path.display(), e)))?;
        if map.is_empty() {
            return Err(AppError::Config(format!("Roster file {} has no tickers", path.display())));
        }
        Ok(Self::from_pairs(map))
    }

    pub fn builtin() -> Self {
        Self::from_pairs([
            ("ASIANPAINT.NS", "Asian Paints Limited"),
            ("AXISBANK.NS", "Axis Bank Limited"),
        ])
    }

    /// Keeps only the given tickers (case-insensitive). An empty filter keeps everything.
    pub fn filtered(self, tickers: &[String]) -> Self {
        if tickers.is_empty() {
            return self;
        }
        let records = self
            .records
            .into_iter()
            .filter(|r| tickers.iter().any(|t| t.eq_ignore_ascii_case(&r.ticker)))
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[TickerRecord] {
        &self.records
    }

    pub fn company_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.company_name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
