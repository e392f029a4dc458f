use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::market_api::{DailyFilter, DailySummary};

/// Result of the last successful multi-filter query.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub filter: DailyFilter,
    pub rows: Vec<DailySummary>,
    pub dates: Vec<String>,
}

/// Per-analyst state handed to every command. It outlives a single CLI run by
/// being saved next to the database, and is cleared by an explicit reset.
#[derive(Debug, Default)]
pub struct SessionState {
    last_query: RwLock<Option<Arc<QuerySnapshot>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<QuerySnapshot>> {
        self.last_query.read().clone()
    }

    /// Replace the slot wholesale.
    pub fn store(&self, snapshot: QuerySnapshot) {
        *self.last_query.write() = Some(Arc::new(snapshot));
    }

    pub fn reset(&self) {
        *self.last_query.write() = None;
    }

    /// Restore the slot written by [`SessionState::save`]. A missing file is an
    /// empty slot.
    pub fn load(path: &Path) -> Result<Self> {
        let state = Self::new();
        if path.exists() {
            let text = std::fs::read_to_string(path)?;
            state.store(serde_json::from_str(&text)?);
        }
        Ok(state)
    }

    /// An empty slot removes the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self.snapshot() {
            Some(snapshot) => {
                if let Some(dir) = path.parent() {
                    if !dir.as_os_str().is_empty() {
                        std::fs::create_dir_all(dir)?;
                    }
                }
                std::fs::write(path, serde_json::to_string_pretty(snapshot.as_ref())?)?;
            }
            None if path.exists() => std::fs::remove_file(path)?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(day: u32) -> QuerySnapshot {
        let d = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        QuerySnapshot {
            filter: DailyFilter::new(d, d, "1344"),
            rows: Vec::new(),
            dates: vec![d.format("%Y-%m-%d").to_string()],
        }
    }

    #[test]
    fn test_store_replaces_and_reset_clears() {
        let state = SessionState::new();
        assert!(state.snapshot().is_none());

        state.store(snapshot(4));
        let first = state.snapshot().unwrap();
        state.store(snapshot(5));
        assert_eq!(state.snapshot().unwrap().dates, vec!["2024-03-05"]);
        // earlier readers keep their own copy
        assert_eq!(first.dates, vec!["2024-03-04"]);

        state.reset();
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_save_load_and_reset_file() {
        let path = std::env::temp_dir().join(format!("atm_state_{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert!(SessionState::load(&path).unwrap().snapshot().is_none());

        let state = SessionState::new();
        state.store(snapshot(4));
        state.save(&path).unwrap();
        let restored = SessionState::load(&path).unwrap();
        assert_eq!(restored.snapshot().unwrap().dates, vec!["2024-03-04"]);

        restored.reset();
        restored.save(&path).unwrap();
        assert!(!path.exists());
    }
}
