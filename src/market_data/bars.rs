use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Closing price of one instrument for one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Time-aligned prices of both legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub date: NaiveDate,

    /// First leg (regressor)
    pub price_a: f64,

    /// Second leg (regressand)
    pub price_b: f64,
}

impl PricePair {
    pub fn new(date: NaiveDate, price_a: f64, price_b: f64) -> Self {
        Self {
            date,
            price_a,
            price_b,
        }
    }
}

impl fmt::Display for PricePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} A={:>10.4} B={:>10.4}",
            self.date.format(DATE_FORMAT),
            self.price_a,
            self.price_b
        )
    }
}

/// Parse `date,price_a,price_b` rows
///
/// A first row whose date does not parse is treated as a header. Blank
/// lines and `#` comments are skipped. Rows are returned in file order;
/// the caller is responsible for chronological ordering.
pub fn parse_pair_csv(input: &str) -> crate::Result<Vec<PricePair>> {
    let mut pairs = Vec::new();
    let mut first_row = true;

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let header_allowed = std::mem::replace(&mut first_row, false);

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(crate::Error::MarketData(format!(
                "Line {}: expected 3 fields, got {}",
                idx + 1,
                fields.len()
            )));
        }

        let date = match NaiveDate::parse_from_str(fields[0], DATE_FORMAT) {
            Ok(date) => date,
            Err(_) if header_allowed => continue,
            Err(e) => {
                return Err(crate::Error::MarketData(format!(
                    "Line {}: bad date {:?}: {}",
                    idx + 1,
                    fields[0],
                    e
                )));
            }
        };

        let price_a = parse_price(fields[1], idx)?;
        let price_b = parse_price(fields[2], idx)?;
        pairs.push(PricePair::new(date, price_a, price_b));
    }

    Ok(pairs)
}

/// Read and parse a pair CSV file
pub fn load_pair_csv(path: impl AsRef<Path>) -> crate::Result<Vec<PricePair>> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::MarketData(format!("Cannot read {}: {}", path.display(), e))
    })?;
    parse_pair_csv(&input)
}

/// Inner join of two series on date, ascending
///
/// Dates present in only one series are dropped. If a series repeats a
/// date, the last bar wins.
pub fn align_series(a: &[PriceBar], b: &[PriceBar]) -> Vec<PricePair> {
    let b_by_date: BTreeMap<NaiveDate, f64> = b.iter().map(|bar| (bar.date, bar.close)).collect();
    let a_by_date: BTreeMap<NaiveDate, f64> = a.iter().map(|bar| (bar.date, bar.close)).collect();

    a_by_date
        .into_iter()
        .filter_map(|(date, price_a)| {
            b_by_date
                .get(&date)
                .map(|&price_b| PricePair::new(date, price_a, price_b))
        })
        .collect()
}

fn parse_price(field: &str, idx: usize) -> crate::Result<f64> {
    let price: f64 = field.parse().map_err(|e| {
        crate::Error::MarketData(format!("Line {}: bad price {:?}: {}", idx + 1, field, e))
    })?;

    if !price.is_finite() {
        return Err(crate::Error::MarketData(format!(
            "Line {}: price must be finite",
            idx + 1
        )));
    }

    Ok(price)
}
