use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::database::columns::ColumnMap;
use crate::error::Result;
use crate::market_api::session::DEFAULT_GAP_THRESHOLD_SECS;
use crate::market_api::utils::MIN_WINDOW_SAMPLES;
use crate::market_api::{ScanSettings, StepPattern};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding the ATM samples
    pub db_path: PathBuf,

    /// Pooled SQLite connections; also bounds useful scan parallelism
    pub db_max_connections: u32,

    /// Trading mode used when a command does not name one
    pub default_mode: String,

    /// Seconds between two samples before the session chart breaks the line
    pub gap_threshold_secs: i64,

    /// Samples a window needs before it is compared
    pub min_window_samples: usize,

    /// Worker threads for the similarity scan
    pub worker_threads: usize,

    /// DTW step pattern used by the similarity scan
    pub step_pattern: StepPattern,

    /// Alignment size that triggers a scaling warning
    pub dtw_warn_cells: usize,

    /// Share of the trend chart's vertical axis used by the equilibrium sum
    pub equilibrium_axis_share: f64,

    /// Floor of the equilibrium band; `null` uses the observed minimum
    pub equilibrium_floor: Option<f64>,

    /// Cache lifetime of fetched intraday rows
    pub rows_cache_ttl_secs: u64,

    /// Cache lifetime of the trading date list
    pub dates_cache_ttl_secs: u64,

    /// Where the last filter result is kept between runs
    pub state_path: PathBuf,

    /// Cancel a similarity scan that runs longer than this
    pub scan_timeout_secs: Option<u64>,

    /// Source column names tried at import
    pub columns: ColumnMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/atm_trend.db"),
            db_max_connections: 8,
            default_mode: "1344".to_string(),
            gap_threshold_secs: DEFAULT_GAP_THRESHOLD_SECS,
            min_window_samples: MIN_WINDOW_SAMPLES,
            worker_threads: 4,
            step_pattern: StepPattern::Symmetric1,
            dtw_warn_cells: 250_000,
            equilibrium_axis_share: 0.40,
            equilibrium_floor: Some(0.0),
            rows_cache_ttl_secs: 600,
            dates_cache_ttl_secs: 3600,
            state_path: PathBuf::from("data/last_query.json"),
            scan_timeout_secs: None,
            columns: ColumnMap::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                serde_json::from_str(&text)?
            }
            None => AppConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ATM_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ATM_MODE") {
            self.default_mode = v;
        }
        if let Some(n) = lookup("ATM_WORKERS").and_then(|v| v.trim().parse().ok()) {
            self.worker_threads = n;
        }
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            worker_threads: self.worker_threads.max(1),
            min_samples: self.min_window_samples,
            warn_matrix_cells: self.dtw_warn_cells,
        }
    }

    pub fn gap_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.gap_threshold_secs)
    }

    pub fn rows_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rows_cache_ttl_secs)
    }

    pub fn dates_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dates_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = AppConfig::default();
        assert_eq!(c.gap_threshold_secs, 600);
        assert_eq!(c.min_window_samples, 5);
        assert_eq!(c.equilibrium_floor, Some(0.0));
        assert_eq!(c.scan_settings().min_samples, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: AppConfig = serde_json::from_str(r#"{"default_mode": "night", "worker_threads": 2}"#).unwrap();
        assert_eq!(c.default_mode, "night");
        assert_eq!(c.worker_threads, 2);
        assert_eq!(c.rows_cache_ttl_secs, 600);
        assert_eq!(c.columns.price_change, vec!["FT漲跌", "漲跌價"]);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("ATM_MODE", "night"), ("ATM_WORKERS", "x")].into_iter().collect();
        let mut c = AppConfig::default();
        c.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.default_mode, "night");
        // unparsable worker count is ignored
        assert_eq!(c.worker_threads, 4);
    }
}
