use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::dtw::{distance_with, StepPattern};
use super::normalize::normalize;
use super::query::QueryService;
use super::types::{IntradaySample, NormalizationMethod, SimilarityResult};
use super::utils::{window_samples, MIN_WINDOW_SAMPLES};
use crate::error::{AnalyzerError, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimilarityRequest {
    pub mode: String,
    pub template_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub method: NormalizationMethod,
    pub top_n: Option<usize>,
    #[serde(default)]
    pub step_pattern: StepPattern,
}

/// Tuning for the candidate scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    pub worker_threads: usize,
    pub min_samples: usize,
    /// Log a scaling warning when one alignment exceeds this many matrix cells.
    pub warn_matrix_cells: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            min_samples: MIN_WINDOW_SAMPLES,
            warn_matrix_cells: 250_000,
        }
    }
}

/// Shared between the scan and whoever drives it; lets the caller abort and
/// watch progress.
#[derive(Debug, Default)]
pub struct ScanControl {
    cancelled: AtomicBool,
    scanned: AtomicUsize,
    total: AtomicUsize,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// (candidates scanned, candidates in this scan)
    pub fn progress(&self) -> (usize, usize) {
        (self.scanned.load(Ordering::Relaxed), self.total.load(Ordering::Relaxed))
    }
}

/// Template window plus the ranked candidates.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimilarityReport {
    pub template_date: String,
    pub template_samples: Vec<IntradaySample>,
    pub results: Vec<SimilarityResult>,
}

/// Rank every other trading day by how closely its `[start_time, end_time]`
/// window tracks the template day's window. Lower scores are closer.
pub fn find_similar<S: QueryService + ?Sized>(
    service: &S,
    request: &SimilarityRequest,
    candidate_dates: &[NaiveDate],
    settings: &ScanSettings,
    control: &ScanControl,
) -> Result<SimilarityReport> {
    if request.start_time >= request.end_time {
        return Err(AnalyzerError::InvalidTimeWindow {
            start: request.start_time,
            end: request.end_time,
        });
    }
    if !candidate_dates.contains(&request.template_date) {
        return Err(AnalyzerError::InvalidTemplateDate(request.template_date));
    }

    let template_rows = service.fetch_session_rows(&request.mode, &[request.template_date])?;
    let template_samples = window_samples(
        &template_rows,
        request.template_date,
        request.start_time,
        request.end_time,
    );
    if template_samples.len() < settings.min_samples {
        return Err(AnalyzerError::InsufficientTemplateData {
            date: request.template_date,
            found: template_samples.len(),
            required: settings.min_samples,
        });
    }

    let template_norm = normalize(&prices(&template_samples), request.method);

    let candidates: Vec<NaiveDate> = candidate_dates
        .iter()
        .copied()
        .filter(|d| *d != request.template_date)
        .collect();
    control.total.store(candidates.len(), Ordering::Relaxed);
    control.scanned.store(0, Ordering::Relaxed);

    info!(
        template = %request.template_date,
        candidates = candidates.len(),
        workers = settings.worker_threads,
        "scanning candidate days"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.worker_threads.max(1))
        .build()?;

    // indexed parallel collect keeps scan order, so the stable sort below
    // breaks ties the same way a serial scan would
    let scored: Vec<Option<SimilarityResult>> = pool.install(|| {
        candidates
            .par_iter()
            .map(|day| score_candidate(service, request, *day, &template_norm, settings, control))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut results: Vec<SimilarityResult> = scored.into_iter().flatten().collect();
    results.sort_by(|a, b| a.score.total_cmp(&b.score));
    if let Some(n) = request.top_n {
        results.truncate(n);
    }

    info!(matched = results.len(), "similarity scan finished");

    Ok(SimilarityReport {
        template_date: request.template_date.format("%Y-%m-%d").to_string(),
        template_samples,
        results,
    })
}

fn score_candidate<S: QueryService + ?Sized>(
    service: &S,
    request: &SimilarityRequest,
    day: NaiveDate,
    template_norm: &[f64],
    settings: &ScanSettings,
    control: &ScanControl,
) -> Result<Option<SimilarityResult>> {
    if control.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
    }

    let rows = service.fetch_session_rows(&request.mode, &[day])?;
    let window = window_samples(&rows, day, request.start_time, request.end_time);
    control.scanned.fetch_add(1, Ordering::Relaxed);

    if window.len() < settings.min_samples {
        debug!(%day, samples = window.len(), "skipping candidate with too few samples");
        return Ok(None);
    }

    let candidate_norm = normalize(&prices(&window), request.method);
    let cells = template_norm.len() * candidate_norm.len();
    if cells > settings.warn_matrix_cells {
        warn!(%day, cells, "alignment matrix is large; session length may be too long");
    }

    let score = match distance_with(template_norm, &candidate_norm, request.step_pattern) {
        Some(score) => score,
        None => return Ok(None),
    };

    Ok(Some(SimilarityResult {
        date: day.format("%Y-%m-%d").to_string(),
        score,
        raw_samples: window,
    }))
}

fn prices(samples: &[IntradaySample]) -> Vec<f64> {
    samples.iter().map(|s| s.instrument_price).collect()
}
