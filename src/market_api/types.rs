use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One observed tick of the ATM table after column resolution.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IntradaySample {
    pub timestamp: NaiveDateTime,
    pub instrument_price: f64,
    pub instrument_price_change: Option<f64>,
    pub equilibrium_sum: Option<f64>,
    pub equilibrium_sum_change: Option<f64>,
    pub trading_mode: String,
}

impl IntradaySample {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationMethod {
    /// Divide by the first value; keeps relative percentage moves.
    RelativeMagnitude,
    /// Min-max rescale into [0, 1]; keeps only the shape.
    PureShape,
}

impl std::str::FromStr for NormalizationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "relativemagnitude" | "relative" => Ok(NormalizationMethod::RelativeMagnitude),
            "pureshape" | "shape" => Ok(NormalizationMethod::PureShape),
            other => Err(format!("unknown normalization method: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimilarityResult {
    pub date: String,
    pub score: f64, // lower = more similar
    pub raw_samples: Vec<IntradaySample>,
}

/// A stitched row on the synthetic session axis.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionAxisRow {
    pub timestamp: NaiveDateTime,
    pub sequence_index: usize,
    pub instrument_price: Option<f64>,
    pub instrument_price_change: Option<f64>,
    pub equilibrium_sum: Option<f64>,
    pub equilibrium_sum_change: Option<f64>,
    pub trading_mode: String,
    pub is_gap: bool,
}

impl SessionAxisRow {
    pub fn from_sample(sample: &IntradaySample, sequence_index: usize) -> Self {
        Self {
            timestamp: sample.timestamp,
            sequence_index,
            instrument_price: Some(sample.instrument_price),
            instrument_price_change: sample.instrument_price_change,
            equilibrium_sum: sample.equilibrium_sum,
            equilibrium_sum_change: sample.equilibrium_sum_change,
            trading_mode: sample.trading_mode.clone(),
            is_gap: false,
        }
    }

    /// Break marker placed one minute after `previous`.
    pub fn gap_after(previous: &IntradaySample, sequence_index: usize) -> Self {
        Self {
            timestamp: previous.timestamp + chrono::Duration::minutes(1),
            sequence_index,
            instrument_price: None,
            instrument_price_change: None,
            equilibrium_sum: None,
            equilibrium_sum_change: None,
            trading_mode: previous.trading_mode.clone(),
            is_gap: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendOptions {
    pub start_date: NaiveDate,
    pub day_count: usize,
    /// Share of the vertical axis given to the equilibrium sum, counted from the bottom.
    pub equilibrium_axis_share: f64,
    pub base_price: Option<f64>,
    /// Lower bound of the equilibrium band. `None` uses the observed minimum.
    pub equilibrium_floor: Option<f64>,
    pub price_tick_count: usize,
}

impl TrendOptions {
    pub fn new(start_date: NaiveDate, day_count: usize) -> Self {
        Self {
            start_date,
            day_count,
            equilibrium_axis_share: 0.40,
            base_price: None,
            equilibrium_floor: Some(0.0),
            price_tick_count: 4,
        }
    }
}

/// Per trading day row of the multi-filter table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DailySummary {
    pub date: String,
    pub weekday: String,
    pub day_close: Option<f64>,
    pub day_close_change: Option<f64>,
    pub day_close_equilibrium: Option<f64>,
    pub night_close: Option<f64>,
    pub night_close_change: Option<f64>,
    pub night_close_equilibrium: Option<f64>,
    pub next_day_close: Option<f64>,
    pub next_day_close_change: Option<f64>,
    pub next_day_close_equilibrium: Option<f64>,
    pub next_night_close: Option<f64>,
    pub next_night_close_change: Option<f64>,
    pub next_night_close_equilibrium: Option<f64>,
    pub max_up: f64,
    pub max_down: f64,
    pub equilibrium_max_up: f64,
    pub equilibrium_max_down: f64,
}
