use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::query::mode_matches;
use super::types::{DailySummary, IntradaySample};
use super::utils::{clock, weekday_label};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Largest positive change of the day.
    Up,
    /// Most negative change of the day.
    Down,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct MoveFilter {
    pub direction: MoveDirection,
    pub min: f64,
    pub max: f64,
}

impl MoveFilter {
    fn accepts(&self, max_up: f64, max_down: f64) -> bool {
        let v = match self.direction {
            MoveDirection::Up => max_up,
            MoveDirection::Down => max_down,
        };
        v >= self.min && v <= self.max
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mode: String,
    /// ISO weekday numbers, 1 = Monday. Empty selects Monday to Saturday.
    #[serde(default)]
    pub weekdays: Vec<u32>,
    pub time_band: Option<(NaiveTime, NaiveTime)>,
    pub price_band: Option<(f64, f64)>,
    pub equilibrium_band: Option<(f64, f64)>,
    pub price_move: Option<MoveFilter>,
    pub equilibrium_move: Option<MoveFilter>,
}

impl DailyFilter {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, mode: impl Into<String>) -> Self {
        Self {
            start_date,
            end_date,
            mode: mode.into(),
            weekdays: Vec::new(),
            time_band: None,
            price_band: None,
            equilibrium_band: None,
            price_move: None,
            equilibrium_move: None,
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect()
    }

    fn weekday_selected(&self, date: NaiveDate) -> bool {
        let iso = date.weekday().number_from_monday();
        if self.weekdays.is_empty() {
            iso <= 6
        } else {
            self.weekdays.contains(&iso)
        }
    }

    // rows feeding the per-day move statistics
    fn in_range(&self, s: &IntradaySample) -> bool {
        if let Some((lo, hi)) = self.time_band {
            let t = s.timestamp.time();
            if t < lo || t > hi {
                return false;
            }
        }
        if let Some((lo, hi)) = self.price_band {
            if s.instrument_price < lo || s.instrument_price > hi {
                return false;
            }
        }
        if let Some((lo, hi)) = self.equilibrium_band {
            match s.equilibrium_sum {
                Some(v) if v >= lo && v <= hi => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MoveStats {
    max_up: f64,
    max_down: f64,
    eq_max_up: f64,
    eq_max_down: f64,
}

impl MoveStats {
    fn absorb(&mut self, s: &IntradaySample) {
        if let Some(c) = s.instrument_price_change {
            if c > 0.0 {
                self.max_up = self.max_up.max(c);
            } else if c < 0.0 {
                self.max_down = self.max_down.min(c);
            }
        }
        if let Some(c) = s.equilibrium_sum_change {
            if c > 0.0 {
                self.eq_max_up = self.eq_max_up.max(c);
            } else if c < 0.0 {
                self.eq_max_down = self.eq_max_down.min(c);
            }
        }
    }
}

const DAY_CLOSE_CUTOFF: NaiveTime = clock(13, 44, 59);
const NIGHT_START: NaiveTime = clock(15, 0, 0);
const NIGHT_END: NaiveTime = clock(5, 0, 0);

/// Trading date a night-session sample closes into, if it is one.
fn night_session_date(s: &IntradaySample) -> Option<NaiveDate> {
    let t = s.timestamp.time();
    if t >= NIGHT_START {
        Some(s.date())
    } else if t < NIGHT_END {
        s.date().pred_opt()
    } else {
        None
    }
}

fn keep_latest<'a>(map: &mut BTreeMap<NaiveDate, &'a IntradaySample>, date: NaiveDate, s: &'a IntradaySample) {
    match map.get(&date) {
        Some(existing) if existing.timestamp >= s.timestamp => {}
        _ => {
            map.insert(date, s);
        }
    }
}

type Close = (Option<f64>, Option<f64>, Option<f64>);

fn close_of(s: Option<&&IntradaySample>) -> Close {
    match s {
        Some(s) => (Some(s.instrument_price), s.instrument_price_change, s.equilibrium_sum),
        None => (None, None, None),
    }
}

/// One row per qualifying trading day, newest first.
///
/// Move statistics come from the range-filtered rows; closes always come from
/// every row of the day so the time and price bands do not shift them.
pub fn summarize_days(samples: &[IntradaySample], filter: &DailyFilter) -> Vec<DailySummary> {
    let base: Vec<&IntradaySample> = samples
        .iter()
        .filter(|s| mode_matches(&s.trading_mode, &filter.mode))
        .filter(|s| s.date() >= filter.start_date && s.date() <= filter.end_date)
        .collect();

    let mut stats: BTreeMap<NaiveDate, MoveStats> = BTreeMap::new();
    let mut day_close: BTreeMap<NaiveDate, &IntradaySample> = BTreeMap::new();
    let mut night_close: BTreeMap<NaiveDate, &IntradaySample> = BTreeMap::new();
    let mut trade_dates: Vec<NaiveDate> = Vec::new();

    for s in base.iter().copied() {
        trade_dates.push(s.date());
        if filter.in_range(s) {
            stats.entry(s.date()).or_default().absorb(s);
        }
        if s.timestamp.time() <= DAY_CLOSE_CUTOFF {
            keep_latest(&mut day_close, s.date(), s);
        }
        if let Some(d) = night_session_date(s) {
            keep_latest(&mut night_close, d, s);
        }
    }
    trade_dates.sort();
    trade_dates.dedup();

    let mut out = Vec::new();
    for (date, st) in &stats {
        if let Some(f) = &filter.price_move {
            if !f.accepts(st.max_up, st.max_down) {
                continue;
            }
        }
        if let Some(f) = &filter.equilibrium_move {
            if !f.accepts(st.eq_max_up, st.eq_max_down) {
                continue;
            }
        }
        if !filter.weekday_selected(*date) {
            continue;
        }
        let Some(today) = day_close.get(date) else {
            continue;
        };

        let next_date = trade_dates
            .binary_search(date)
            .ok()
            .and_then(|i| trade_dates.get(i + 1))
            .copied();

        let (day_close_price, day_close_change, day_close_eq) = close_of(Some(today));
        let (night_close_price, night_close_change, night_close_eq) = close_of(night_close.get(date));
        let (next_day, next_day_change, next_day_eq) =
            close_of(next_date.and_then(|d| day_close.get(&d)));
        let (next_night, next_night_change, next_night_eq) =
            close_of(next_date.and_then(|d| night_close.get(&d)));

        out.push(DailySummary {
            date: date.format("%Y-%m-%d").to_string(),
            weekday: weekday_label(*date).to_string(),
            day_close: day_close_price,
            day_close_change,
            day_close_equilibrium: day_close_eq,
            night_close: night_close_price,
            night_close_change,
            night_close_equilibrium: night_close_eq,
            next_day_close: next_day,
            next_day_close_change: next_day_change,
            next_day_close_equilibrium: next_day_eq,
            next_night_close: next_night,
            next_night_close_change: next_night_change,
            next_night_close_equilibrium: next_night_eq,
            max_up: st.max_up,
            max_down: st.max_down,
            equilibrium_max_up: st.eq_max_up,
            equilibrium_max_down: st.eq_max_down,
        });
    }

    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample(ts: NaiveDateTime, price: f64, change: f64, eq: f64, eq_change: f64) -> IntradaySample {
        IntradaySample {
            timestamp: ts,
            instrument_price: price,
            instrument_price_change: Some(change),
            equilibrium_sum: Some(eq),
            equilibrium_sum_change: Some(eq_change),
            trading_mode: "1344".to_string(),
        }
    }

    // Mon 4th and Tue 5th, each with a day and a night session.
    fn fixture() -> Vec<IntradaySample> {
        vec![
            sample(dt(4, 9, 0), 8000.0, 50.0, 300.0, 10.0),
            sample(dt(4, 10, 0), 8100.0, 150.0, 320.0, 30.0),
            sample(dt(4, 13, 44), 8080.0, 130.0, 310.0, 20.0),
            sample(dt(4, 13, 45), 8090.0, 140.0, 305.0, 15.0),
            sample(dt(4, 16, 0), 8070.0, -10.0, 300.0, -5.0),
            sample(dt(5, 4, 30), 8060.0, -20.0, 290.0, -15.0),
            sample(dt(5, 9, 0), 8050.0, -10.0, 280.0, -25.0),
            sample(dt(5, 13, 30), 7990.0, -70.0, 260.0, -45.0),
            sample(dt(5, 20, 0), 8010.0, 20.0, 270.0, 10.0),
        ]
    }

    #[test]
    fn test_closes_and_next_day() {
        let filter = DailyFilter::new(date(4), date(5), "1344");
        let rows = summarize_days(&fixture(), &filter);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-03-05");
        let mon = &rows[1];
        assert_eq!(mon.weekday, "一");
        // 13:45 is past the day-session close cutoff
        assert_eq!(mon.day_close, Some(8080.0));
        assert_eq!(mon.night_close, Some(8060.0));
        assert_eq!(mon.next_day_close, Some(7990.0));
        assert_eq!(mon.next_night_close, Some(8010.0));
        assert_eq!(mon.max_up, 150.0);
        assert_eq!(mon.max_down, -10.0);

        let tue = &rows[0];
        assert_eq!(tue.next_day_close, None);
        assert_eq!(tue.max_up, 20.0);
        assert_eq!(tue.max_down, -70.0);
    }

    #[test]
    fn test_move_filter() {
        let mut filter = DailyFilter::new(date(4), date(5), "1344");
        filter.price_move = Some(MoveFilter { direction: MoveDirection::Up, min: 100.0, max: 500.0 });
        let rows = summarize_days(&fixture(), &filter);
        assert_eq!(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(), vec!["2024-03-04"]);

        filter.price_move = None;
        filter.equilibrium_move = Some(MoveFilter { direction: MoveDirection::Down, min: -50.0, max: -40.0 });
        let rows = summarize_days(&fixture(), &filter);
        assert_eq!(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(), vec!["2024-03-05"]);
    }

    #[test]
    fn test_time_band_limits_stats_not_closes() {
        let mut filter = DailyFilter::new(date(4), date(4), "1344");
        filter.time_band = Some((
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        ));
        let rows = summarize_days(&fixture(), &filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].max_up, 50.0);
        assert_eq!(rows[0].day_close, Some(8080.0));
    }

    #[test]
    fn test_price_band_can_empty_a_day() {
        let mut filter = DailyFilter::new(date(4), date(5), "1344");
        filter.price_band = Some((8000.0, 8200.0));
        let rows = summarize_days(&fixture(), &filter);
        // Tuesday still has 8050 and 8010 in the band
        assert_eq!(rows.len(), 2);

        filter.price_band = Some((8075.0, 8200.0));
        let rows = summarize_days(&fixture(), &filter);
        assert_eq!(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(), vec!["2024-03-04"]);
    }

    #[test]
    fn test_weekday_selection() {
        let mut filter = DailyFilter::new(date(4), date(5), "1344");
        filter.weekdays = vec![2];
        let rows = summarize_days(&fixture(), &filter);
        assert_eq!(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(), vec!["2024-03-05"]);
    }

    #[test]
    fn test_sunday_excluded_by_default() {
        let samples = vec![sample(dt(10, 9, 0), 8000.0, 1.0, 1.0, 1.0)];
        let filter = DailyFilter::new(date(10), date(10), "1344");
        assert!(summarize_days(&samples, &filter).is_empty());
    }

    #[test]
    fn test_mode_mismatch_is_ignored() {
        let filter = DailyFilter::new(date(4), date(5), "night");
        assert!(summarize_days(&fixture(), &filter).is_empty());
    }

    #[test]
    fn test_filter_dates() {
        let filter = DailyFilter::new(date(4), date(6), "1344");
        assert_eq!(filter.dates(), vec![date(4), date(5), date(6)]);
    }
}
