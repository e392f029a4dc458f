use std::time::Duration;

use chrono::NaiveDate;
use moka::sync::Cache;
use tracing::debug;

use crate::error::Result;
use crate::market_api::{IntradaySample, QueryService};

/// TTL cache in front of a [`QueryService`]. Intraday rows and the trading
/// date list expire on separate clocks; failures are never cached.
pub struct CachedQueryService<S> {
    inner: S,
    rows: Cache<String, Vec<IntradaySample>>,
    dates: Cache<String, Vec<NaiveDate>>,
}

impl<S: QueryService> CachedQueryService<S> {
    pub fn new(inner: S, rows_ttl: Duration, dates_ttl: Duration) -> Self {
        let rows = Cache::builder()
            .max_capacity(4_096)
            .time_to_live(rows_ttl)
            .build();

        let dates = Cache::builder()
            .max_capacity(64)
            .time_to_live(dates_ttl)
            .build();

        Self { inner, rows, dates }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop everything, e.g. after an import.
    pub fn invalidate_all(&self) {
        self.rows.invalidate_all();
        self.dates.invalidate_all();
    }

    fn mode_key(mode: &str) -> String {
        mode.trim().to_lowercase()
    }

    fn rows_key(mode: &str, dates: &[NaiveDate]) -> String {
        let mut days: Vec<String> = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
        days.sort();
        days.dedup();
        format!("{}:{}", Self::mode_key(mode), days.join(","))
    }
}

impl<S: QueryService> QueryService for CachedQueryService<S> {
    fn fetch_session_rows(&self, mode: &str, dates: &[NaiveDate]) -> Result<Vec<IntradaySample>> {
        let key = Self::rows_key(mode, dates);
        if let Some(hit) = self.rows.get(&key) {
            debug!(%key, "intraday rows served from cache");
            return Ok(hit);
        }
        let rows = self.inner.fetch_session_rows(mode, dates)?;
        self.rows.insert(key, rows.clone());
        Ok(rows)
    }

    fn list_all_trading_dates(&self, mode: &str) -> Result<Vec<NaiveDate>> {
        let key = Self::mode_key(mode);
        if let Some(hit) = self.dates.get(&key) {
            return Ok(hit);
        }
        let dates = self.inner.list_all_trading_dates(mode)?;
        self.dates.insert(key, dates.clone());
        Ok(dates)
    }

    fn date_bounds(&self, mode: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let dates = self.list_all_trading_dates(mode)?;
        Ok(dates.first().copied().zip(dates.last().copied()))
    }
}
