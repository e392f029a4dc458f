use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, Result};
use tracing::debug;

use crate::market_api::utils::parse_datetime;
use crate::market_api::IntradaySample;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn save_samples(conn: &mut Connection, samples: &[IntradaySample]) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO intraday_samples
             (ts, mode, price, price_change, equilibrium_sum, equilibrium_sum_change, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for item in samples {
            stmt.execute(params![
                item.timestamp.format(TS_FORMAT).to_string(),
                item.trading_mode.trim(),
                item.instrument_price,
                item.instrument_price_change,
                item.equilibrium_sum,
                item.equilibrium_sum_change,
                now
            ])?;
            count += 1;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn get_samples_for_dates(conn: &Connection, mode: &str, dates: &[NaiveDate]) -> Result<Vec<IntradaySample>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (0..dates.len())
        .map(|i| format!("?{}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT ts, mode, price, price_change, equilibrium_sum, equilibrium_sum_change
         FROM intraday_samples
         WHERE LOWER(TRIM(mode)) = LOWER(TRIM(?1))
           AND substr(ts, 1, 10) IN ({})
         ORDER BY ts",
        placeholders
    );

    let mut values: Vec<String> = Vec::with_capacity(dates.len() + 1);
    values.push(mode.to_string());
    values.extend(dates.iter().map(|d| d.format("%Y-%m-%d").to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<f64>>(2)?,
            row.get::<_, Option<f64>>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
        ))
    })?;

    let mut data = Vec::new();
    let mut dropped = 0usize;
    for row in rows {
        let (ts, mode, price, price_change, eq, eq_change) = row?;
        match (parse_datetime(&ts), price) {
            (Some(timestamp), Some(instrument_price)) => data.push(IntradaySample {
                timestamp,
                instrument_price,
                instrument_price_change: price_change,
                equilibrium_sum: eq,
                equilibrium_sum_change: eq_change,
                trading_mode: mode,
            }),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped rows without timestamp or price");
    }
    data.sort_by_key(|s| s.timestamp);
    Ok(data)
}

pub fn get_trading_dates(conn: &Connection, mode: &str) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT substr(ts, 1, 10) AS d
         FROM intraday_samples
         WHERE LOWER(TRIM(mode)) = LOWER(TRIM(?1))
         ORDER BY d",
    )?;

    let rows = stmt.query_map(params![mode], |row| row.get::<_, String>(0))?;

    let mut dates = Vec::new();
    for row in rows {
        if let Ok(d) = NaiveDate::parse_from_str(&row?, "%Y-%m-%d") {
            dates.push(d);
        }
    }
    Ok(dates)
}

pub fn get_date_bounds(conn: &Connection, mode: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let mut stmt = conn.prepare(
        "SELECT MIN(substr(ts, 1, 10)), MAX(substr(ts, 1, 10))
         FROM intraday_samples
         WHERE LOWER(TRIM(mode)) = LOWER(TRIM(?1))",
    )?;

    let (min, max): (Option<String>, Option<String>) =
        stmt.query_row(params![mode], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let parse = |s: Option<String>| s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
    Ok(parse(min).zip(parse(max)))
}
