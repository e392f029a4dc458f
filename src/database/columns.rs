use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::market_api::utils::parse_datetime;
use crate::market_api::IntradaySample;

/// Candidate source keys per canonical field, tried in order. The first key
/// present with a usable value wins.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnMap {
    pub timestamp: Vec<String>,
    pub price: Vec<String>,
    pub price_change: Vec<String>,
    pub equilibrium_sum: Vec<String>,
    pub equilibrium_sum_change: Vec<String>,
    pub mode: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let keys = |ks: &[&str]| ks.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        Self {
            timestamp: keys(&["時間戳記", "timestamp", "dt"]),
            price: keys(&["FT價格"]),
            price_change: keys(&["FT漲跌", "漲跌價"]),
            equilibrium_sum: keys(&["價平和(價平)"]),
            equilibrium_sum_change: keys(&["價平和漲跌(價平)"]),
            mode: keys(&["mode"]),
        }
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|x| x.is_finite())
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ColumnMap {
    fn first<T>(record: &Map<String, Value>, keys: &[String], f: impl Fn(&Value) -> Option<T>) -> Option<T> {
        keys.iter().filter_map(|k| record.get(k)).find_map(f)
    }

    /// Resolve one raw record. `None` means the row has no usable timestamp or price.
    pub fn resolve(&self, record: &Map<String, Value>, default_mode: &str) -> Option<IntradaySample> {
        let timestamp = Self::first(record, &self.timestamp, |v| v.as_str().and_then(parse_datetime))?;
        let instrument_price = Self::first(record, &self.price, as_number)?;
        Some(IntradaySample {
            timestamp,
            instrument_price,
            instrument_price_change: Self::first(record, &self.price_change, as_number),
            equilibrium_sum: Self::first(record, &self.equilibrium_sum, as_number),
            equilibrium_sum_change: Self::first(record, &self.equilibrium_sum_change, as_number),
            trading_mode: Self::first(record, &self.mode, as_text)
                .unwrap_or_else(|| default_mode.trim().to_string()),
        })
    }
}
