use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// All errors generated by the trend analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("template date {0} is not a known trading day")]
    InvalidTemplateDate(NaiveDate),

    #[error("template {date} has {found} samples in the window, at least {required} required")]
    InsufficientTemplateData {
        date: NaiveDate,
        found: usize,
        required: usize,
    },

    #[error("start time {start} must be earlier than end time {end}")]
    InvalidTimeWindow { start: NaiveTime, end: NaiveTime },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("no samples available to draw the trend")]
    EmptyTrendData,

    #[error("similarity scan cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
