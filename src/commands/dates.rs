use serde::{Deserialize, Serialize};

use crate::market_api::QueryService;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TradingDates {
    pub mode: String,
    pub first: Option<String>,
    pub last: Option<String>,
    pub dates: Vec<String>,
}

pub fn get_trading_dates<S: QueryService + ?Sized>(service: &S, mode: &str) -> Result<TradingDates, String> {
    let dates = service
        .list_all_trading_dates(mode)
        .map_err(|e| format!("Failed to get trading dates: {}", e))?;
    let bounds = service
        .date_bounds(mode)
        .map_err(|e| format!("Failed to get date bounds: {}", e))?;

    let fmt = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
    Ok(TradingDates {
        mode: mode.to_string(),
        first: bounds.map(|(lo, _)| fmt(lo)),
        last: bounds.map(|(_, hi)| fmt(hi)),
        dates: dates.into_iter().map(fmt).collect(),
    })
}
