use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::chart::{AxisKind, AxisTicks, ChartSpec, ChartTrace, PlotPoint};
use super::types::{IntradaySample, SessionAxisRow};
use super::utils::{clock, weekday_label};

pub const DEFAULT_GAP_THRESHOLD_SECS: i64 = 10 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Day,
    Night,
}

/// Which wall-clock span belongs to one trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionWindow {
    /// 08:45 to 13:46 inclusive on any date.
    Day,
    /// 15:00 on `start_date` up to (not including) 05:01 on the next calendar date.
    Night { start_date: NaiveDate },
}

impl SessionWindow {
    pub fn day() -> Self {
        SessionWindow::Day
    }

    pub fn night(start_date: NaiveDate) -> Self {
        SessionWindow::Night { start_date }
    }

    pub fn contains(&self, sample: &IntradaySample) -> bool {
        let date = sample.timestamp.date();
        let time = sample.timestamp.time();
        match self {
            SessionWindow::Day => time >= DAY_OPEN && time <= DAY_CLOSE,
            SessionWindow::Night { start_date } => {
                let next = start_date.succ_opt();
                (date == *start_date && time >= NIGHT_OPEN)
                    || (Some(date) == next && time < NIGHT_CUTOFF)
            }
        }
    }
}

const DAY_OPEN: NaiveTime = clock(8, 45, 0);
const DAY_CLOSE: NaiveTime = clock(13, 46, 0);
const NIGHT_OPEN: NaiveTime = clock(15, 0, 0);
/// Next-morning samples before this still belong to the previous night.
const NIGHT_CUTOFF: NaiveTime = clock(5, 1, 0);

const NIGHT_TICKS: [NaiveTime; 7] = [
    clock(16, 0, 0),
    clock(18, 0, 0),
    clock(20, 0, 0),
    clock(22, 0, 0),
    clock(0, 0, 0),
    clock(2, 0, 0),
    clock(4, 0, 0),
];
const DAY_TICKS: [NaiveTime; 3] = [clock(9, 0, 0), clock(11, 0, 0), clock(13, 0, 0)];

/// Lay one session on a dense index axis, inserting a break row wherever two
/// neighbouring samples are more than `gap_threshold` apart.
pub fn stitch(
    samples: &[IntradaySample],
    window: &SessionWindow,
    gap_threshold: Duration,
) -> Vec<SessionAxisRow> {
    let mut session: Vec<&IntradaySample> = samples.iter().filter(|s| window.contains(s)).collect();
    session.sort_by_key(|s| s.timestamp);

    let mut rows = Vec::with_capacity(session.len());
    let mut index = 0;
    for (i, sample) in session.iter().enumerate() {
        if i > 0 {
            let prev = session[i - 1];
            if sample.timestamp - prev.timestamp > gap_threshold {
                rows.push(SessionAxisRow::gap_after(prev, index));
                index += 1;
            }
        }
        rows.push(SessionAxisRow::from_sample(sample, index));
        index += 1;
    }
    rows
}

fn tick_targets(kind: SessionKind) -> &'static [NaiveTime] {
    match kind {
        SessionKind::Night => &NIGHT_TICKS,
        SessionKind::Day => &DAY_TICKS,
    }
}

/// Map chosen wall-clock times back onto sequence indices for x-axis labels.
pub fn session_ticks(rows: &[SessionAxisRow], kind: SessionKind) -> AxisTicks {
    let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.timestamp.date()).collect();
    dates.sort();
    dates.dedup();

    let mut ticks: Vec<(usize, String)> = Vec::new();
    let Some(&first_date) = dates.first() else {
        return AxisTicks::default();
    };

    for &target_time in tick_targets(kind) {
        let target_date = if target_time >= NIGHT_OPEN {
            first_date
        } else {
            dates.get(1).copied().unwrap_or(first_date)
        };

        let hit = rows
            .iter()
            .filter(|r| r.timestamp.date() == target_date && r.timestamp.time() >= target_time)
            .min_by_key(|r| r.timestamp);

        if let Some(row) = hit {
            if ticks.iter().any(|(idx, _)| *idx == row.sequence_index) {
                continue;
            }
            let label = format!(
                "{}({})\n{}",
                row.timestamp.format("%Y-%m-%d"),
                weekday_label(row.timestamp.date()),
                target_time.format("%H:%M")
            );
            ticks.push((row.sequence_index, label));
        }
    }

    ticks.sort_by_key(|(idx, _)| *idx);
    let mut out = AxisTicks::default();
    for (idx, label) in ticks {
        out.push(idx as f64, label);
    }
    out
}

/// Chart of one stitched session; gap rows become line breaks.
pub fn session_chart(
    rows: &[SessionAxisRow],
    kind: SessionKind,
    y_range: Option<(f64, f64)>,
    y_ticks: Option<AxisTicks>,
) -> ChartSpec {
    let (color, x_title) = match kind {
        SessionKind::Night => ("#FF8C00", "夜盤交易時段 (15:00 ~ 次日 05:00，已壓縮)"),
        SessionKind::Day => ("#1E90FF", "日盤交易時段 (08:45 ~ 13:45，已壓縮)"),
    };

    let mut chart = ChartSpec::new("單日連續交易時段趨勢圖 (FT 走勢)", AxisKind::Sequence);
    if rows.is_empty() {
        chart.title = "無數據".to_string();
        return chart;
    }

    let mut trace = ChartTrace::line("台指期價格", color, 1.0);
    trace.show_legend = false;
    trace.points = rows
        .iter()
        .map(|r| PlotPoint {
            x: r.sequence_index as f64,
            y: r.instrument_price,
            hover: Some(r.timestamp.format("%Y-%m-%d %H:%M").to_string()),
        })
        .collect();

    chart.traces.push(trace);
    chart.x_title = Some(x_title.to_string());
    chart.y_title = Some("FT 價格".to_string());
    chart.x_ticks = Some(session_ticks(rows, kind));
    chart.y_range = y_range;
    chart.y_ticks = y_ticks;
    chart
}
