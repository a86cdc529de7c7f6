//! Aggregates derived from progress history.
//!
//! Days are calendar days in UTC. Every function here is pure over a
//! history slice so the service only has to fetch rows.

use crate::db::{ProgressHistory, timestamp_to_datetime};
use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Highest heatmap intensity.
pub const MAX_LEVEL: u8 = 4;

/// Widest heatmap window, in days.
pub const MAX_HEATMAP_DAYS: u32 = 366;

/// One heatmap cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapDay {
    /// Calendar day.
    pub date: NaiveDate,
    /// Pages read that day.
    pub pages_read: i64,
    /// Intensity bucket, 0 to 4.
    pub level: u8,
}

/// Pages read on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPages {
    /// Calendar day.
    pub date: NaiveDate,
    /// Pages read that day.
    pub pages_read: i64,
}

/// Pages read in one Sunday-based week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyPages {
    /// Sunday that opens the week.
    pub week_start: NaiveDate,
    /// Pages read that week.
    pub pages_read: i64,
}

/// Totals over a whole history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadingStats {
    /// Number of recorded sessions.
    pub total_sessions: i64,
    /// Sum of pages read.
    pub total_pages: i64,
    /// Sum of time spent, in seconds.
    pub total_time_seconds: i64,
    /// Earliest session timestamp.
    pub first_session_at: Option<i64>,
    /// Latest session timestamp.
    pub last_session_at: Option<i64>,
}

/// Calendar day (UTC) of a timestamp.
pub fn day_of(ts: i64) -> NaiveDate {
    timestamp_to_datetime(ts).date_naive()
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// `ceil(pages / max * 4)` capped at 4; no pages is level 0.
pub fn heatmap_level(pages: i64, max_pages: i64) -> u8 {
    if pages <= 0 || max_pages <= 0 {
        return 0;
    }
    let level = (pages as f64 / max_pages as f64 * MAX_LEVEL as f64).ceil();
    level.min(MAX_LEVEL as f64) as u8
}

fn sum_by<K: Ord>(
    history: &[ProgressHistory],
    key: impl Fn(&ProgressHistory) -> K,
) -> BTreeMap<K, i64> {
    let mut buckets = BTreeMap::new();
    for entry in history {
        *buckets.entry(key(entry)).or_insert(0) += entry.pages_read;
    }
    buckets
}

/// First day of the trailing `days` window ending on `today`.
///
/// `None` for an empty window or one reaching past the calendar range.
pub fn window_start(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    let back = days.checked_sub(1)?;
    today.checked_sub_days(Days::new(u64::from(back)))
}

/// One cell per day over the trailing `days` window ending on `today`.
pub fn heatmap(history: &[ProgressHistory], today: NaiveDate, days: u32) -> Vec<HeatmapDay> {
    let Some(start) = window_start(today, days) else {
        return Vec::new();
    };

    let in_window: Vec<ProgressHistory> = history
        .iter()
        .filter(|h| {
            let day = day_of(h.session_at);
            day >= start && day <= today
        })
        .cloned()
        .collect();
    let per_day = sum_by(&in_window, |h| day_of(h.session_at));
    let max_pages = per_day.values().copied().max().unwrap_or(0);

    start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let pages_read = per_day.get(&date).copied().unwrap_or(0);
            HeatmapDay {
                date,
                pages_read,
                level: heatmap_level(pages_read, max_pages),
            }
        })
        .collect()
}

/// Pages summed per calendar day, oldest first. Days without sessions are omitted.
pub fn pages_per_day(history: &[ProgressHistory]) -> Vec<DailyPages> {
    sum_by(history, |h| day_of(h.session_at))
        .into_iter()
        .map(|(date, pages_read)| DailyPages { date, pages_read })
        .collect()
}

/// Pages summed per week (weeks start on Sunday), oldest first.
pub fn pages_per_week(history: &[ProgressHistory]) -> Vec<WeeklyPages> {
    sum_by(history, |h| week_start(day_of(h.session_at)))
        .into_iter()
        .map(|(week_start, pages_read)| WeeklyPages {
            week_start,
            pages_read,
        })
        .collect()
}

/// Session, page and time totals.
pub fn summarize(history: &[ProgressHistory]) -> ReadingStats {
    history.iter().fold(ReadingStats::default(), |mut acc, h| {
        acc.total_sessions += 1;
        acc.total_pages += h.pages_read;
        acc.total_time_seconds += h.time_spent_seconds;
        let at = h.session_at;
        acc.first_session_at = Some(acc.first_session_at.map_or(at, |t| t.min(at)));
        acc.last_session_at = Some(acc.last_session_at.map_or(at, |t| t.max(at)));
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, hour: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    fn entry(session_at: i64, pages_read: i64, time_spent_seconds: i64) -> ProgressHistory {
        ProgressHistory {
            id: 0,
            user_id: "u".to_string(),
            book_id: "b".to_string(),
            session_at,
            pages_read,
            time_spent_seconds,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn level_buckets() {
        assert_eq!(heatmap_level(0, 40), 0);
        assert_eq!(heatmap_level(1, 40), 1);
        assert_eq!(heatmap_level(10, 40), 1);
        assert_eq!(heatmap_level(11, 40), 2);
        assert_eq!(heatmap_level(30, 40), 3);
        assert_eq!(heatmap_level(40, 40), 4);
        assert_eq!(heatmap_level(5, 0), 0);
    }

    #[test]
    fn levels_are_monotonic_and_bounded() {
        let max = 37;
        let mut last = 0;
        for pages in 0..=max {
            let level = heatmap_level(pages, max);
            assert!(level <= MAX_LEVEL);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn heatmap_covers_every_day_in_window() {
        let history = vec![
            entry(ts(2026, 3, 10, 8), 20, 600),
            entry(ts(2026, 3, 10, 21), 20, 600),
            entry(ts(2026, 3, 12, 9), 10, 300),
            // Outside the window
            entry(ts(2026, 3, 1, 9), 500, 300),
        ];

        let cells = heatmap(&history, date(2026, 3, 14), 7);
        assert_eq!(cells.len(), 7);
        assert_eq!(cells[0].date, date(2026, 3, 8));
        assert_eq!(cells[6].date, date(2026, 3, 14));

        let tenth = &cells[2];
        assert_eq!(tenth.pages_read, 40);
        assert_eq!(tenth.level, 4);

        let twelfth = &cells[4];
        assert_eq!(twelfth.pages_read, 10);
        assert_eq!(twelfth.level, 1);

        assert!(cells.iter().filter(|c| c.pages_read == 0).all(|c| c.level == 0));
    }

    #[test]
    fn empty_heatmap_window() {
        assert!(heatmap(&[], date(2026, 1, 1), 0).is_empty());
        let cells = heatmap(&[], date(2026, 1, 1), 3);
        assert!(cells.iter().all(|c| c.level == 0));
    }

    #[test]
    fn window_start_stays_in_calendar_range() {
        assert_eq!(window_start(date(2026, 3, 14), 7), Some(date(2026, 3, 8)));
        assert_eq!(window_start(date(2026, 3, 14), 1), Some(date(2026, 3, 14)));
        assert_eq!(window_start(date(2026, 3, 14), 0), None);
        assert_eq!(window_start(date(2026, 3, 14), u32::MAX), None);
        assert!(heatmap(&[], date(2026, 3, 14), u32::MAX).is_empty());
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2026-03-15 is a Sunday
        assert_eq!(week_start(date(2026, 3, 15)), date(2026, 3, 15));
        assert_eq!(week_start(date(2026, 3, 18)), date(2026, 3, 15));
        assert_eq!(week_start(date(2026, 3, 21)), date(2026, 3, 15));
        assert_eq!(week_start(date(2026, 3, 22)), date(2026, 3, 22));
    }

    #[test]
    fn daily_and_weekly_sums() {
        let history = vec![
            entry(ts(2026, 3, 14, 8), 5, 0),
            entry(ts(2026, 3, 15, 8), 7, 0),
            entry(ts(2026, 3, 15, 20), 3, 0),
            entry(ts(2026, 3, 21, 8), 4, 0),
        ];

        let daily = pages_per_day(&history);
        assert_eq!(
            daily,
            vec![
                DailyPages { date: date(2026, 3, 14), pages_read: 5 },
                DailyPages { date: date(2026, 3, 15), pages_read: 10 },
                DailyPages { date: date(2026, 3, 21), pages_read: 4 },
            ]
        );

        let weekly = pages_per_week(&history);
        assert_eq!(
            weekly,
            vec![
                WeeklyPages { week_start: date(2026, 3, 8), pages_read: 5 },
                WeeklyPages { week_start: date(2026, 3, 15), pages_read: 14 },
            ]
        );
    }

    #[test]
    fn summary_totals() {
        let first = ts(2026, 3, 1, 8);
        let last = ts(2026, 3, 9, 8);
        let history = vec![
            entry(ts(2026, 3, 5, 8), 10, 600),
            entry(first, 0, 60),
            entry(last, 12, 900),
        ];

        let stats = summarize(&history);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_pages, 22);
        assert_eq!(stats.total_time_seconds, 1560);
        assert_eq!(stats.first_session_at, Some(first));
        assert_eq!(stats.last_session_at, Some(last));

        assert_eq!(summarize(&[]), ReadingStats::default());
    }
}
