use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_api::{summarize_days, DailyFilter, DailySummary, QueryService};
use crate::state::{QuerySnapshot, SessionState};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilterResponse {
    pub found: bool,
    pub message: String,
    pub rows: Vec<DailySummary>,
    pub dates: Vec<String>,
}

/// Multi-filter query. Only a successful query replaces the session snapshot.
pub fn run_daily_filter<S: QueryService + ?Sized>(
    service: &S,
    state: &SessionState,
    filter: DailyFilter,
) -> Result<FilterResponse, String> {
    if filter.start_date > filter.end_date {
        return Err(format!(
            "Invalid date range: {} is after {}",
            filter.start_date, filter.end_date
        ));
    }
    if let Some(bad) = filter.weekdays.iter().find(|w| !(1..=7).contains(*w)) {
        return Err(format!("Invalid weekday: {}", bad));
    }

    info!(start = %filter.start_date, end = %filter.end_date, mode = %filter.mode, "daily filter");

    let samples = service
        .fetch_session_rows(&filter.mode, &filter.dates())
        .map_err(|e| format!("Failed to fetch intraday rows: {}", e))?;

    let rows = summarize_days(&samples, &filter);
    let dates: Vec<String> = rows.iter().map(|r| r.date.clone()).collect();

    state.store(QuerySnapshot {
        filter,
        rows: rows.clone(),
        dates: dates.clone(),
    });

    Ok(FilterResponse::new(rows, dates))
}

/// Re-render the last filter result without querying again.
pub fn last_daily_filter(state: &SessionState) -> Result<FilterResponse, String> {
    let snapshot = state
        .snapshot()
        .ok_or_else(|| "No previous filter query to show".to_string())?;
    Ok(FilterResponse::new(snapshot.rows.clone(), snapshot.dates.clone()))
}

pub fn reset_session(state: &SessionState) {
    state.reset();
    info!("session state cleared");
}

impl FilterResponse {
    fn new(rows: Vec<DailySummary>, dates: Vec<String>) -> Self {
        let found = !rows.is_empty();
        let message = if found {
            format!("{} trading days matched", rows.len())
        } else {
            "No trading days matched the filter".to_string()
        };
        Self {
            found,
            message,
            rows,
            dates,
        }
    }
}
