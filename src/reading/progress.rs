//! Progress rules applied to every report.

use crate::db::{ProgressHistory, ReadingProgress};
use serde::Deserialize;

/// Progress at or above this percentage marks a book as finished.
pub const COMPLETION_THRESHOLD: f64 = 95.0;

/// A progress report from a reader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressReport {
    /// Page the reader is on now.
    pub current_page: i64,
    /// Reported percentage; clamped before use.
    pub progress: f64,
    /// Total pages, when the reader knows it.
    #[serde(default)]
    pub total_pages: Option<i64>,
    /// Seconds spent reading since the last report.
    #[serde(default)]
    pub time_spent_seconds: Option<i64>,
    /// Version the client last saw; checked under `VersionChecked`.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Clamp a raw percentage into `[0, 100]`. NaN counts as 0.
pub fn clamp_progress(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 100.0)
    }
}

/// Whether a percentage counts as finished.
pub fn is_completed(progress: f64) -> bool {
    clamp_progress(progress) >= COMPLETION_THRESHOLD
}

/// Pages advanced since the previous report. Never negative.
pub fn pages_read(current_page: i64, previous_page: i64) -> i64 {
    current_page.saturating_sub(previous_page).max(0)
}

/// Zero-delta reports are only logged for the very first session.
pub fn should_record_history(pages_read: i64, has_prior: bool) -> bool {
    pages_read > 0 || !has_prior
}

/// Rows to write for one report.
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    /// New state of the progress row.
    pub progress: ReadingProgress,
    /// History row to append, if any (`id` is assigned on insert).
    pub history: Option<ProgressHistory>,
}

/// Compute the rows a report produces given the previous state.
pub fn plan_write(
    user_id: &str,
    book_id: &str,
    previous: Option<&ReadingProgress>,
    report: &ProgressReport,
    now: i64,
) -> ProgressWrite {
    let progress = clamp_progress(report.progress);
    let previous_page = previous.map(|p| p.current_page).unwrap_or(0);
    let delta = pages_read(report.current_page, previous_page);

    let history = should_record_history(delta, previous.is_some()).then(|| ProgressHistory {
        id: 0,
        user_id: user_id.to_string(),
        book_id: book_id.to_string(),
        session_at: now,
        pages_read: delta,
        time_spent_seconds: report.time_spent_seconds.unwrap_or(0),
    });

    ProgressWrite {
        progress: ReadingProgress {
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            current_page: report.current_page,
            total_pages: report
                .total_pages
                .or_else(|| previous.and_then(|p| p.total_pages)),
            progress,
            is_completed: is_completed(progress),
            last_read_at: now,
            version: previous.map(|p| p.version + 1).unwrap_or(1),
        },
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(current_page: i64, progress: f64) -> ProgressReport {
        ProgressReport {
            current_page,
            progress,
            ..Default::default()
        }
    }

    fn prior(current_page: i64) -> ReadingProgress {
        ReadingProgress {
            user_id: "u".to_string(),
            book_id: "b".to_string(),
            current_page,
            total_pages: Some(200),
            progress: 5.0,
            is_completed: false,
            last_read_at: 0,
            version: 3,
        }
    }

    #[test]
    fn clamp_stays_in_range() {
        for raw in [-50.0, -0.1, 0.0, 12.5, 99.9, 100.0, 100.1, 1e9, f64::NAN] {
            let p = clamp_progress(raw);
            assert!((0.0..=100.0).contains(&p), "{raw} -> {p}");
        }
        assert_eq!(clamp_progress(12.5), 12.5);
        assert_eq!(clamp_progress(-3.0), 0.0);
        assert_eq!(clamp_progress(140.0), 100.0);
    }

    #[test]
    fn completion_threshold() {
        assert!(!is_completed(94.99));
        assert!(is_completed(95.0));
        assert!(is_completed(97.0));
        assert!(is_completed(250.0));
        assert!(!is_completed(f64::NAN));
    }

    #[test]
    fn pages_read_never_negative() {
        assert_eq!(pages_read(25, 10), 15);
        assert_eq!(pages_read(10, 25), 0);
        assert_eq!(pages_read(7, 7), 0);
        assert_eq!(pages_read(i64::MIN, i64::MAX), 0);
    }

    #[test]
    fn history_policy() {
        assert!(should_record_history(0, false));
        assert!(should_record_history(3, true));
        assert!(!should_record_history(0, true));
    }

    #[test]
    fn first_report_counts_from_page_zero() {
        let write = plan_write("u", "b", None, &report(12, 6.0), 100);
        assert_eq!(write.progress.version, 1);
        assert_eq!(write.history.unwrap().pages_read, 12);
    }

    #[test]
    fn forward_report_records_delta() {
        let prev = prior(10);
        let write = plan_write("u", "b", Some(&prev), &report(25, 12.5), 100);

        assert_eq!(write.progress.progress, 12.5);
        assert!(!write.progress.is_completed);
        assert_eq!(write.progress.version, 4);
        assert_eq!(write.progress.total_pages, Some(200));
        assert_eq!(write.history.unwrap().pages_read, 15);
    }

    #[test]
    fn backwards_report_writes_no_history() {
        let prev = prior(40);
        let write = plan_write("u", "b", Some(&prev), &report(30, 15.0), 100);
        assert_eq!(write.progress.current_page, 30);
        assert!(write.history.is_none());
    }

    #[test]
    fn high_progress_completes_regardless_of_pages() {
        let write = plan_write("u", "b", Some(&prior(3)), &report(3, 97.0), 100);
        assert!(write.progress.is_completed);
    }
}
