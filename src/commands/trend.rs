use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AnalyzerError;
use crate::market_api::utils::{consecutive_dates, parse_date};
use crate::market_api::{derive_base_price, make_trend, ChartSpec, QueryService, TrendOptions};
use crate::state::SessionState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrendQuery {
    pub mode: String,
    /// `None` takes the date at `pick` from the last filter result.
    pub start_date: Option<NaiveDate>,
    /// Index into the last filter result's dates, newest first.
    #[serde(default)]
    pub pick: usize,
    pub day_count: usize,
    /// Overrides the settlement price derived from the first sample.
    pub base_price: Option<f64>,
}

fn resolve_start(state: &SessionState, query: &TrendQuery) -> Result<NaiveDate, String> {
    if let Some(start) = query.start_date {
        return Ok(start);
    }
    let snapshot = state
        .snapshot()
        .ok_or_else(|| "No start date given and no previous filter query".to_string())?;
    let day = snapshot.dates.get(query.pick).ok_or_else(|| {
        format!(
            "Last filter result has {} dates, cannot pick #{}",
            snapshot.dates.len(),
            query.pick
        )
    })?;
    parse_date(day)
}

pub fn build_trend_chart<S: QueryService + ?Sized>(
    service: &S,
    state: &SessionState,
    config: &AppConfig,
    query: &TrendQuery,
) -> Result<ChartSpec, String> {
    if query.day_count == 0 {
        return Err(AnalyzerError::InvalidOptions("day_count must be at least 1".to_string()).to_string());
    }

    let start = resolve_start(state, query)?;
    let dates = consecutive_dates(start, query.day_count);
    let samples = service
        .fetch_session_rows(&query.mode, &dates)
        .map_err(|e| format!("Failed to fetch intraday rows: {}", e))?;

    let mut opts = TrendOptions::new(start, query.day_count);
    opts.equilibrium_axis_share = config.equilibrium_axis_share;
    opts.equilibrium_floor = config.equilibrium_floor;
    opts.base_price = query.base_price.or_else(|| derive_base_price(&samples));

    info!(%start, days = query.day_count, rows = samples.len(), "trend chart");
    make_trend(&samples, &opts).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::seeded_db;
    use crate::commands::run_daily_filter;
    use crate::market_api::DailyFilter;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn query(start: Option<u32>, days: usize) -> TrendQuery {
        TrendQuery {
            mode: "1344".to_string(),
            start_date: start.map(date),
            pick: 0,
            day_count: days,
            base_price: None,
        }
    }

    #[test]
    fn test_trend_spans_consecutive_calendar_days() {
        let db = seeded_db(&[4, 5, 6, 8], |_, m| 8000.0 + m as f64);
        let chart = build_trend_chart(&db, &SessionState::new(), &AppConfig::default(), &query(Some(4), 3)).unwrap();
        assert!(chart.title.contains("2024-03-04"));
        let price_lines = chart.traces.iter().filter(|t| t.name == "FT價格").count();
        // the 8th is outside the three-day window
        assert_eq!(price_lines, 3);
        assert!(chart.title.ends_with("連續 3 個交易日"));
    }

    #[test]
    fn test_start_taken_from_last_filter_result() {
        let db = seeded_db(&[4, 5, 6], |_, m| 8000.0 + m as f64);
        let state = SessionState::new();
        let config = AppConfig::default();
        assert!(build_trend_chart(&db, &state, &config, &query(None, 1)).is_err());

        run_daily_filter(&db, &state, DailyFilter::new(date(4), date(6), "1344")).unwrap();
        // dates are newest first, so pick 1 is the 5th
        let mut q = query(None, 1);
        q.pick = 1;
        let chart = build_trend_chart(&db, &state, &config, &q).unwrap();
        assert!(chart.title.contains("2024-03-05"));

        q.pick = 9;
        assert!(build_trend_chart(&db, &state, &config, &q).is_err());
    }

    #[test]
    fn test_empty_window_and_zero_days() {
        let db = seeded_db(&[4], |_, m| 8000.0 + m as f64);
        let state = SessionState::new();
        let err = build_trend_chart(&db, &state, &AppConfig::default(), &query(Some(20), 2)).unwrap_err();
        assert_eq!(err, AnalyzerError::EmptyTrendData.to_string());
        assert!(build_trend_chart(&db, &state, &AppConfig::default(), &query(Some(4), 0)).is_err());
    }
}
