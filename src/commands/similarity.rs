use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::market_api::{find_similar, QueryService, ScanControl, SimilarityReport, SimilarityRequest};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimilarityResponse {
    pub found: bool,
    pub message: String,
    pub report: SimilarityReport,
}

/// Rank every trading day of the mode against the template window.
pub fn run_similarity_search<S: QueryService + ?Sized>(
    service: &S,
    config: &AppConfig,
    request: &SimilarityRequest,
    control: &ScanControl,
) -> Result<SimilarityResponse, String> {
    let dates = service
        .list_all_trading_dates(&request.mode)
        .map_err(|e| format!("Failed to get trading dates: {}", e))?;

    let report = find_similar(service, request, &dates, &config.scan_settings(), control)
        .map_err(|e| e.to_string())?;

    let found = !report.results.is_empty();
    let message = if found {
        format!("Found {} similar trading days", report.results.len())
    } else {
        "No similar trading days found".to_string()
    };
    info!(template = %request.template_date, matches = report.results.len(), "similarity search done");

    Ok(SimilarityResponse { found, message, report })
}

const WATCH_INTERVAL: Duration = Duration::from_millis(200);

/// Report scan progress until `done` is set, cancelling the scan once
/// `timeout` has elapsed.
pub fn watch_scan(control: &ScanControl, done: &AtomicBool, timeout: Option<Duration>, interval: Duration) {
    let started = Instant::now();
    let mut reported = 0;
    while !done.load(Ordering::Acquire) {
        if timeout.is_some_and(|t| started.elapsed() >= t) {
            warn!(?timeout, "similarity scan timed out, cancelling");
            control.cancel();
            return;
        }
        let (scanned, total) = control.progress();
        if scanned != reported {
            debug!(scanned, total, "scan progress");
            reported = scanned;
        }
        std::thread::sleep(interval);
    }
}

/// [`run_similarity_search`] with a watcher that enforces `scan_timeout_secs`.
pub fn run_watched_similarity_search<S: QueryService + ?Sized>(
    service: &S,
    config: &AppConfig,
    request: &SimilarityRequest,
) -> Result<SimilarityResponse, String> {
    let control = ScanControl::new();
    let done = AtomicBool::new(false);
    let timeout = config.scan_timeout_secs.map(Duration::from_secs);

    std::thread::scope(|scope| {
        scope.spawn(|| watch_scan(&control, &done, timeout, WATCH_INTERVAL));
        let out = run_similarity_search(service, config, request, &control);
        done.store(true, Ordering::Release);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::seeded_db;
    use crate::market_api::{NormalizationMethod, StepPattern};
    use chrono::{NaiveDate, NaiveTime};

    fn request(template: u32) -> SimilarityRequest {
        SimilarityRequest {
            mode: "1344".to_string(),
            template_date: NaiveDate::from_ymd_opt(2024, 3, template).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            method: NormalizationMethod::PureShape,
            top_n: Some(2),
            step_pattern: StepPattern::Symmetric1,
        }
    }

    #[test]
    fn test_search_ranks_same_shape_first() {
        // the 5th rises like the 4th, the 6th falls
        let db = seeded_db(&[4, 5, 6], |d, m| match d {
            6 => 8100.0 - m as f64,
            _ => 8000.0 + (m * d) as f64,
        });
        let out = run_similarity_search(&db, &AppConfig::default(), &request(4), &ScanControl::new()).unwrap();
        assert!(out.found);
        assert_eq!(out.report.results[0].date, "2024-03-05");
        assert!(out.report.results[0].score < out.report.results[1].score);
    }

    #[test]
    fn test_nothing_found_is_not_an_error() {
        let db = seeded_db(&[4], |_, m| 8000.0 + m as f64);
        let out = run_similarity_search(&db, &AppConfig::default(), &request(4), &ScanControl::new()).unwrap();
        assert!(!out.found);
        assert_eq!(out.message, "No similar trading days found");
    }

    #[test]
    fn test_unknown_template_date() {
        let db = seeded_db(&[4], |_, m| 8000.0 + m as f64);
        let err = run_similarity_search(&db, &AppConfig::default(), &request(9), &ScanControl::new()).unwrap_err();
        assert!(err.contains("2024-03-09"));
    }

    #[test]
    fn test_watcher_cancels_after_timeout() {
        let control = ScanControl::new();
        let done = AtomicBool::new(false);
        watch_scan(&control, &done, Some(Duration::ZERO), Duration::from_millis(1));
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_watcher_stops_when_scan_is_done() {
        let control = ScanControl::new();
        let done = AtomicBool::new(true);
        watch_scan(&control, &done, Some(Duration::ZERO), Duration::from_millis(1));
        assert!(!control.is_cancelled());
    }

    #[test]
    fn test_watched_search_without_timeout() {
        let db = seeded_db(&[4, 5], |_, m| 8000.0 + m as f64);
        let out = run_watched_similarity_search(&db, &AppConfig::default(), &request(4)).unwrap();
        assert_eq!(out.report.results.len(), 1);
        assert_eq!(out.report.results[0].date, "2024-03-05");
    }
}
