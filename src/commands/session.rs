use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::market_api::{session_chart, stitch, ChartSpec, QueryService, SessionKind, SessionWindow};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionQuery {
    pub mode: String,
    /// Trading date; a night session starts on this date.
    pub date: NaiveDate,
    pub kind: SessionKind,
    pub y_range: Option<(f64, f64)>,
}

pub fn build_session_chart<S: QueryService + ?Sized>(
    service: &S,
    config: &AppConfig,
    query: &SessionQuery,
) -> Result<ChartSpec, String> {
    let (window, dates) = match query.kind {
        SessionKind::Day => (SessionWindow::day(), vec![query.date]),
        SessionKind::Night => {
            let mut dates = vec![query.date];
            dates.extend(query.date.succ_opt());
            (SessionWindow::night(query.date), dates)
        }
    };

    let samples = service
        .fetch_session_rows(&query.mode, &dates)
        .map_err(|e| format!("Failed to fetch intraday rows: {}", e))?;

    let rows = stitch(&samples, &window, config.gap_threshold());
    info!(date = %query.date, kind = ?query.kind, rows = rows.len(), "session chart");
    Ok(session_chart(&rows, query.kind, query.y_range, None))
}
