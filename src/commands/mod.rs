pub mod dates;
pub mod filter;
pub mod import;
pub mod session;
pub mod similarity;
pub mod trend;

pub use dates::*;
pub use filter::*;
pub use import::*;
pub use session::*;
pub use similarity::*;
pub use trend::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::database::Database;
    use crate::market_api::IntradaySample;

    pub fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    pub fn sample(timestamp: NaiveDateTime, price: f64, change: f64) -> IntradaySample {
        IntradaySample {
            timestamp,
            instrument_price: price,
            instrument_price_change: Some(change),
            equilibrium_sum: Some(300.0 + change),
            equilibrium_sum_change: Some(change / 2.0),
            trading_mode: "1344".to_string(),
        }
    }

    /// Day session every minute 09:00..09:09 on the given March 2024 dates,
    /// prices following `shape(day, minute)`.
    pub fn seeded_db(days: &[u32], shape: impl Fn(u32, u32) -> f64) -> Database {
        let db = Database::in_memory().unwrap();
        let mut rows = Vec::new();
        for &d in days {
            for m in 0..10 {
                let p = shape(d, m);
                rows.push(sample(ts(2024, 3, d, 9, m), p, p - 8000.0));
            }
        }
        db.save_samples(&rows).unwrap();
        db
    }
}
