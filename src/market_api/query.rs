use chrono::NaiveDate;

use super::types::IntradaySample;
use crate::error::Result;

/// Row source for every analysis. Implementations filter by trading mode with a
/// trimmed, case-insensitive exact match and return samples sorted by timestamp.
pub trait QueryService: Send + Sync {
    /// All samples whose calendar date is one of `dates`.
    fn fetch_session_rows(&self, mode: &str, dates: &[NaiveDate]) -> Result<Vec<IntradaySample>>;

    /// Distinct trading dates in ascending order.
    fn list_all_trading_dates(&self, mode: &str) -> Result<Vec<NaiveDate>>;

    /// First and last trading date, `None` when the mode has no data.
    fn date_bounds(&self, mode: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let dates = self.list_all_trading_dates(mode)?;
        Ok(dates.first().copied().zip(dates.last().copied()))
    }
}

impl<T: QueryService + ?Sized> QueryService for std::sync::Arc<T> {
    fn fetch_session_rows(&self, mode: &str, dates: &[NaiveDate]) -> Result<Vec<IntradaySample>> {
        (**self).fetch_session_rows(mode, dates)
    }

    fn list_all_trading_dates(&self, mode: &str) -> Result<Vec<NaiveDate>> {
        (**self).list_all_trading_dates(mode)
    }

    fn date_bounds(&self, mode: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        (**self).date_bounds(mode)
    }
}

/// Mode comparison used by every service implementation.
pub fn mode_matches(stored: &str, requested: &str) -> bool {
    stored.trim().to_lowercase() == requested.trim().to_lowercase()
}
