mod schema;
mod intraday;
pub mod columns;

use std::path::Path;

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::market_api::{IntradaySample, QueryService};
use columns::ColumnMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub dropped: usize,
}

/// SQLite-backed store of ATM intraday samples.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(db_path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        if let Some(dir) = db_path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path.as_ref()).with_init(|c| {
            c.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            c.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        });

        let pool = Pool::builder().max_size(max_connections.max(1)).build(manager)?;
        Self::with_pool(pool)
    }

    #[cfg(test)]
    /// Single-connection in-memory store; every pooled connection would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self> {
        let db = Database { pool };
        let conn = db.get_conn()?;
        schema::init_tables(&conn)?;
        drop(conn);
        Ok(db)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    pub fn save_samples(&self, samples: &[IntradaySample]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        Ok(intraday::save_samples(&mut conn, samples)?)
    }

    /// Ingest exported ATM records, resolving column names once per record.
    pub fn import_records(&self, records: &[Value], columns: &ColumnMap, default_mode: &str) -> Result<ImportSummary> {
        let samples: Vec<IntradaySample> = records
            .iter()
            .filter_map(|r| r.as_object())
            .filter_map(|r| columns.resolve(r, default_mode))
            .collect();
        let dropped = records.len() - samples.len();
        let inserted = self.save_samples(&samples)?;
        info!(inserted, dropped, "imported intraday records");
        Ok(ImportSummary { inserted, dropped })
    }
}

impl QueryService for Database {
    fn fetch_session_rows(&self, mode: &str, dates: &[NaiveDate]) -> Result<Vec<IntradaySample>> {
        let conn = self.get_conn()?;
        Ok(intraday::get_samples_for_dates(&conn, mode, dates)?)
    }

    fn list_all_trading_dates(&self, mode: &str) -> Result<Vec<NaiveDate>> {
        let conn = self.get_conn()?;
        Ok(intraday::get_trading_dates(&conn, mode)?)
    }

    fn date_bounds(&self, mode: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let conn = self.get_conn()?;
        Ok(intraday::get_date_bounds(&conn, mode)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample(d: u32, h: u32, m: u32, mode: &str) -> IntradaySample {
        IntradaySample {
            timestamp: date(d).and_hms_opt(h, m, 0).unwrap(),
            instrument_price: 8000.0 + m as f64,
            instrument_price_change: Some(m as f64),
            equilibrium_sum: None,
            equilibrium_sum_change: None,
            trading_mode: mode.to_string(),
        }
    }

    #[test]
    fn test_fetch_by_dates_sorted_and_mode_filtered() {
        let db = Database::in_memory().unwrap();
        db.save_samples(&[
            sample(5, 9, 1, "1344"),
            sample(4, 9, 2, "1344"),
            sample(4, 9, 0, "1344"),
            sample(4, 9, 3, "other"),
            sample(6, 9, 0, "1344"),
        ])
        .unwrap();

        let rows = db.fetch_session_rows(" 1344", &[date(4), date(5)]).unwrap();
        let minutes: Vec<f64> = rows.iter().map(|r| r.instrument_price - 8000.0).collect();
        assert_eq!(minutes, vec![0.0, 2.0, 1.0]);
        assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(db.fetch_session_rows("1344", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_trading_dates_and_bounds() {
        let db = Database::in_memory().unwrap();
        db.save_samples(&[
            sample(6, 9, 0, "1344"),
            sample(4, 9, 0, "1344"),
            sample(4, 10, 0, "1344"),
            sample(8, 9, 0, "other"),
        ])
        .unwrap();

        assert_eq!(db.list_all_trading_dates("1344").unwrap(), vec![date(4), date(6)]);
        assert_eq!(db.date_bounds("1344").unwrap(), Some((date(4), date(6))));
        assert_eq!(db.date_bounds("missing").unwrap(), None);
    }

    #[test]
    fn test_import_records_drops_unusable_rows() {
        let db = Database::in_memory().unwrap();
        let records = vec![
            json!({"時間戳記": "2024-03-04 09:00:00", "FT價格": 8100, "漲跌價": 12, "mode": "1344"}),
            json!({"時間戳記": "2024-03-04 09:01:00", "FT價格": null, "mode": "1344"}),
            json!({"FT價格": 8100}),
            json!("not an object"),
        ];
        let summary = db.import_records(&records, &ColumnMap::default(), "1344").unwrap();
        assert_eq!(summary, ImportSummary { inserted: 1, dropped: 3 });

        let rows = db.fetch_session_rows("1344", &[date(4)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].instrument_price_change, Some(12.0));
    }

    #[test]
    fn test_reimport_replaces_same_timestamp() {
        let db = Database::in_memory().unwrap();
        db.save_samples(&[sample(4, 9, 0, "1344")]).unwrap();
        let mut updated = sample(4, 9, 0, "1344");
        updated.instrument_price = 9000.0;
        db.save_samples(&[updated]).unwrap();
        let rows = db.fetch_session_rows("1344", &[date(4)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].instrument_price, 9000.0);
    }
}
