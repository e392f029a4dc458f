use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::chart::{wall_clock_x, AxisKind, AxisTicks, ChartSpec, ChartTrace, PlotPoint};
use super::types::{IntradaySample, TrendOptions};
use super::utils::{format_datetime_with_week, format_thousands, format_with_change};
use crate::error::{AnalyzerError, Result};

pub const DAY_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Affine rescale of `y` from the source range into the target range.
/// A constant source maps to the middle of the target.
pub fn map_value(y: f64, source_min: f64, source_max: f64, target_min: f64, target_max: f64) -> f64 {
    if source_max - source_min == 0.0 {
        return (target_max + target_min) / 2.0;
    }
    (y - source_min) / (source_max - source_min) * (target_max - target_min) + target_min
}

/// Source range of one series and the band of the shared axis it occupies.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct AxisBand {
    pub source_min: f64,
    pub source_max: f64,
    pub target_min: f64,
    pub target_max: f64,
}

impl AxisBand {
    pub fn map(&self, y: f64) -> f64 {
        map_value(y, self.source_min, self.source_max, self.target_min, self.target_max)
    }
}

/// Symmetric range around `base` wide enough to hold both ends.
pub fn recenter_range(min: f64, max: f64, base: f64) -> (f64, f64) {
    let deviation = (max - base).abs().max((base - min).abs());
    (base - deviation, base + deviation)
}

/// Previous settlement: first price minus its own change.
pub fn derive_base_price(samples: &[IntradaySample]) -> Option<f64> {
    let first = samples.first()?;
    first.instrument_price_change.map(|chg| first.instrument_price - chg)
}

/// Both bands of the shared vertical axis.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DualAxisLayout {
    pub equilibrium: AxisBand,
    pub price: AxisBand,
    pub has_equilibrium: bool,
}

impl DualAxisLayout {
    pub fn compute(samples: &[IntradaySample], opts: &TrendOptions) -> Result<Self> {
        let share = opts.equilibrium_axis_share;
        if !(share > 0.0 && share < 1.0) {
            return Err(AnalyzerError::InvalidOptions(format!(
                "equilibrium_axis_share must be inside (0, 1), got {}",
                share
            )));
        }

        let eq_values: Vec<f64> = samples.iter().filter_map(|s| s.equilibrium_sum).collect();
        let observed_eq_min = eq_values.iter().copied().reduce(f64::min);
        let eq_min = opts.equilibrium_floor.or(observed_eq_min).unwrap_or(0.0);
        let mut eq_max = eq_values.iter().copied().reduce(f64::max).unwrap_or(0.0);
        if eq_max - eq_min < 1.0 {
            eq_max += 1.0;
        }

        let mut price_min = samples.iter().map(|s| s.instrument_price).reduce(f64::min).unwrap_or(0.0);
        let mut price_max = samples.iter().map(|s| s.instrument_price).reduce(f64::max).unwrap_or(0.0);
        if price_max - price_min < 1.0 {
            price_min -= 10.0;
            price_max += 10.0;
        }
        if let Some(base) = opts.base_price {
            (price_min, price_max) = recenter_range(price_min, price_max, base);
        }

        Ok(Self {
            equilibrium: AxisBand {
                source_min: eq_min,
                source_max: eq_max,
                target_min: 0.0,
                target_max: share,
            },
            price: AxisBand {
                source_min: price_min,
                source_max: price_max,
                target_min: share,
                target_max: 1.0,
            },
            has_equilibrium: !eq_values.is_empty(),
        })
    }

    /// Three equilibrium ticks (floor, middle, top) followed by the price grid.
    pub fn ticks(&self, price_tick_count: usize) -> AxisTicks {
        let mut ticks = AxisTicks::default();

        let eq = &self.equilibrium;
        let eq_mid = (eq.source_min + eq.source_max) / 2.0;
        for v in [eq.source_min, eq_mid, eq.source_max] {
            let label = if self.has_equilibrium { format_thousands(v) } else { String::new() };
            ticks.push(eq.map(v), label);
        }

        let grid = price_tick_count.max(1);
        let p = &self.price;
        for i in 0..=grid {
            let v = p.source_min + (p.source_max - p.source_min) * i as f64 / grid as f64;
            ticks.push(p.map(v), format_thousands(v));
        }
        ticks
    }
}

/// Multi-day trend with price and equilibrium sum sharing one vertical axis.
pub fn make_trend(samples: &[IntradaySample], opts: &TrendOptions) -> Result<ChartSpec> {
    let mut rows: Vec<&IntradaySample> = samples.iter().collect();
    rows.sort_by_key(|s| s.timestamp);
    if rows.is_empty() {
        return Err(AnalyzerError::EmptyTrendData);
    }

    let layout = DualAxisLayout::compute(samples, opts)?;

    let mut by_date: BTreeMap<NaiveDate, Vec<&IntradaySample>> = BTreeMap::new();
    for s in rows.iter().copied() {
        by_date.entry(s.date()).or_default().push(s);
    }

    let mut chart = ChartSpec::new(
        format!("趨勢圖：從 {} 起連續 {} 個交易日", opts.start_date.format("%Y-%m-%d"), by_date.len()),
        AxisKind::WallClock,
    );

    for (i, day_rows) in by_date.values().enumerate() {
        let color = DAY_PALETTE[i % DAY_PALETTE.len()];
        let is_first_day = i == 0;

        let mut price = ChartTrace::line("FT價格", color, 1.0);
        price.legend_group = Some("FT_Group".to_string());
        price.show_legend = is_first_day;
        price.points = day_rows
            .iter()
            .map(|s| PlotPoint {
                x: wall_clock_x(s.timestamp),
                y: Some(layout.price.map(s.instrument_price)),
                hover: None,
            })
            .collect();
        chart.traces.push(price);

        if layout.has_equilibrium {
            let mut eq = ChartTrace::line("價平和(價平)", color, 0.8);
            eq.dashed = true;
            eq.legend_group = Some("KPH_Group".to_string());
            eq.show_legend = is_first_day;
            eq.points = day_rows
                .iter()
                .map(|s| PlotPoint {
                    x: wall_clock_x(s.timestamp),
                    y: s.equilibrium_sum.map(|v| layout.equilibrium.map(v)),
                    hover: None,
                })
                .collect();
            chart.traces.push(eq);
        }
    }

    let mut hover = ChartTrace::line("統一查價線", "rgba(0,0,0,0)", 0.0);
    hover.show_legend = false;
    hover.hover_only = true;
    hover.points = rows
        .iter()
        .map(|s| PlotPoint {
            x: wall_clock_x(s.timestamp),
            y: Some(layout.price.map(s.instrument_price)),
            hover: Some(unified_hover(s)),
        })
        .collect();
    chart.traces.push(hover);

    let first_x = rows.first().map(|s| wall_clock_x(s.timestamp)).unwrap_or(0.0);
    let last_x = rows.last().map(|s| wall_clock_x(s.timestamp)).unwrap_or(0.0);
    chart.x_range = Some((first_x, last_x));
    chart.y_range = Some((0.0, 1.0));
    chart.y_ticks = Some(layout.ticks(opts.price_tick_count));
    chart.y_title = Some(format!(
        "台指期 ({:.0}%) & 價平和 ({:.0}%)",
        (1.0 - opts.equilibrium_axis_share) * 100.0,
        opts.equilibrium_axis_share * 100.0
    ));
    chart.separator_y = Some(opts.equilibrium_axis_share);
    Ok(chart)
}

fn unified_hover(s: &IntradaySample) -> String {
    format!(
        "{}\nFT價格：{}\n價平和：{}",
        format_datetime_with_week(s.timestamp),
        format_with_change(Some(s.instrument_price), s.instrument_price_change),
        format_with_change(s.equilibrium_sum, s.equilibrium_sum_change)
    )
}
