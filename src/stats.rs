//! Read-side aggregation for the streak and heatmap view. Everything here is
//! a pure function of a ledger snapshot and an explicit "today".

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::daykey::day_key;

/// Number of days covered by the heatmap window.
pub const HEATMAP_DAYS: usize = 365;

/// Absolute mapping of a day's view count to a color bucket, 0 (no
/// activity) through 4 (brightest).
pub fn color_bucket(count: u32) -> u8 {
    match count {
        0 => 0,
        1 => 1,
        2 => 2,
        3 => 3,
        _ => 4,
    }
}

/// Consecutive days with activity, walking backward from `today`. A zero or
/// missing count for today means the streak is 0.
pub fn current_streak(days: &BTreeMap<String, u32>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut cursor = today;
    loop {
        match days.get(&day_key(cursor)) {
            Some(&count) if count > 0 => {
                streak += 1;
                match cursor.pred_opt() {
                    Some(previous) => cursor = previous,
                    None => break,
                }
            }
            _ => break,
        }
    }
    streak
}

/// Number of days with at least one recorded view.
pub fn total_active_days(days: &BTreeMap<String, u32>) -> usize {
    days.values().filter(|&&count| count > 0).count()
}

/// One rendered day cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub day_key: String,
    pub count: u32,
    pub bucket: u8,
    pub label: String,
}

/// One column of the grid: seven day slots, Sunday first. `None` slots pad
/// the window edges and are not rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapWeek {
    pub cells: Vec<Option<HeatmapCell>>,
}

/// Lays out the trailing [`HEATMAP_DAYS`] days ending at `today` as week
/// columns, most recent day at the trailing edge.
pub fn build_heatmap(days: &BTreeMap<String, u32>, today: NaiveDate) -> Vec<HeatmapWeek> {
    let start = today - Days::new((HEATMAP_DAYS - 1) as u64);
    let start_dow = start.weekday().num_days_from_sunday() as i64;
    let weeks = (start_dow as usize + HEATMAP_DAYS).div_ceil(7);

    let mut grid = Vec::with_capacity(weeks);
    for week in 0..weeks {
        let mut cells = Vec::with_capacity(7);
        for slot in 0..7 {
            let index = (week * 7 + slot) as i64 - start_dow;
            if index < 0 || index >= HEATMAP_DAYS as i64 {
                cells.push(None);
                continue;
            }

            let date = start + Days::new(index as u64);
            let key = day_key(date);
            let count = days.get(&key).copied().unwrap_or(0);
            let label = format!(
                "{key}: {count} view{}",
                if count == 1 { "" } else { "s" }
            );

            cells.push(Some(HeatmapCell {
                day_key: key,
                count,
                bucket: color_bucket(count),
                label,
            }));
        }
        grid.push(HeatmapWeek { cells });
    }

    grid
}
