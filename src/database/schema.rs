use rusqlite::Connection;

pub fn init_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS intraday_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            mode TEXT NOT NULL,
            price REAL NOT NULL,
            price_change REAL,
            equilibrium_sum REAL,
            equilibrium_sum_change REAL,
            created_at TEXT NOT NULL,
            UNIQUE(mode, ts)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_intraday_mode_ts ON intraday_samples(mode, ts)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_intraday_day ON intraday_samples(substr(ts, 1, 10))",
        [],
    )?;

    Ok(())
}
