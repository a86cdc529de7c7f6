//! Progress writes and chart queries over the store.

use super::ConflictPolicy;
use super::progress::{self, ProgressReport, ProgressWrite};
use super::stats::{self, DailyPages, HeatmapDay, ReadingStats, WeeklyPages};
use crate::config::ReadingConfig;
use crate::db::{Database, ProgressHistory, ReadingProgress, now_timestamp};
use crate::error::{AppError, Result};
use chrono::{NaiveDate, Utc};

/// Reading progress service.
pub struct ReadingService {
    db: Database,
    conflict_policy: ConflictPolicy,
    heatmap_max_days: u32,
}

impl ReadingService {
    /// Create a new reading service.
    pub fn new(db: Database, config: &ReadingConfig) -> Self {
        Self {
            db,
            conflict_policy: config.conflict_policy,
            heatmap_max_days: config.heatmap_max_days,
        }
    }

    /// Record a progress report: upsert the progress row, append history
    /// when pages moved forward, and backfill the book's page count.
    pub fn record_progress(
        &self,
        user_id: &str,
        book_id: &str,
        report: &ProgressReport,
    ) -> Result<ProgressWrite> {
        validate_report(report)?;

        let write = self.db.transaction(|s| {
            if s.get_book(book_id)?.is_none() {
                return Err(AppError::NotFound(format!("Book not found: {}", book_id)));
            }

            let previous = s.get_progress(user_id, book_id)?;
            if let Some(prev) = &previous {
                self.check_version(prev, report)?;
            }

            let mut write =
                progress::plan_write(user_id, book_id, previous.as_ref(), report, now_timestamp());
            s.upsert_progress(&write.progress)?;

            if let Some(history) = write.history.as_mut() {
                history.id = s.insert_history(history)?;
            }

            if let Some(total) = report.total_pages
                && s.backfill_book_pages(book_id, total)?
            {
                tracing::debug!(book_id, total, "Backfilled book page count");
            }

            Ok(write)
        })?;

        tracing::info!(
            user_id,
            book_id,
            page = write.progress.current_page,
            progress = write.progress.progress,
            completed = write.progress.is_completed,
            pages_read = write.history.as_ref().map(|h| h.pages_read),
            "Progress recorded"
        );
        Ok(write)
    }

    /// Current progress for a book, if any.
    pub fn get_progress(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        self.db.run(|s| s.get_progress(user_id, book_id))
    }

    /// Heatmap over the trailing `days` ending today.
    pub fn get_heatmap(&self, user_id: &str, book_id: &str, days: u32) -> Result<Vec<HeatmapDay>> {
        self.get_heatmap_at(user_id, book_id, days, Utc::now().date_naive())
    }

    /// Heatmap over the trailing `days` ending on `today`.
    pub fn get_heatmap_at(
        &self,
        user_id: &str,
        book_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<HeatmapDay>> {
        let max_days = self.heatmap_max_days.min(stats::MAX_HEATMAP_DAYS);
        let start = stats::window_start(today, days)
            .filter(|_| days <= max_days)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Heatmap window must be between 1 and {} days",
                    max_days
                ))
            })?;

        let since = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let history = self.db.run(|s| s.list_history(user_id, book_id, since))?;
        Ok(stats::heatmap(&history, today, days))
    }

    /// Pages read per day over the whole history.
    pub fn get_pages_per_day(&self, user_id: &str, book_id: &str) -> Result<Vec<DailyPages>> {
        Ok(stats::pages_per_day(&self.history(user_id, book_id)?))
    }

    /// Pages read per Sunday-based week over the whole history.
    pub fn get_pages_per_week(&self, user_id: &str, book_id: &str) -> Result<Vec<WeeklyPages>> {
        Ok(stats::pages_per_week(&self.history(user_id, book_id)?))
    }

    /// Totals over the whole history.
    pub fn get_stats(&self, user_id: &str, book_id: &str) -> Result<ReadingStats> {
        Ok(stats::summarize(&self.history(user_id, book_id)?))
    }

    fn history(&self, user_id: &str, book_id: &str) -> Result<Vec<ProgressHistory>> {
        self.db.run(|s| s.list_history(user_id, book_id, i64::MIN))
    }

    fn check_version(&self, previous: &ReadingProgress, report: &ProgressReport) -> Result<()> {
        match self.conflict_policy {
            ConflictPolicy::LastWriteWins => Ok(()),
            ConflictPolicy::VersionChecked => match report.expected_version {
                Some(v) if v == previous.version => Ok(()),
                Some(v) => Err(AppError::InvalidState(format!(
                    "Stale progress: expected version {}, stored version is {}",
                    v, previous.version
                ))),
                None => Err(AppError::InvalidState(format!(
                    "Progress update must name the version it is based on (current: {})",
                    previous.version
                ))),
            },
        }
    }
}

fn validate_report(report: &ProgressReport) -> Result<()> {
    if report.current_page < 0 {
        return Err(AppError::Validation(
            "Current page must not be negative".to_string(),
        ));
    }
    if let Some(total) = report.total_pages
        && total <= 0
    {
        return Err(AppError::Validation(
            "Total pages must be greater than zero".to_string(),
        ));
    }
    if report.time_spent_seconds.is_some_and(|t| t < 0) {
        return Err(AppError::Validation(
            "Time spent must not be negative".to_string(),
        ));
    }
    Ok(())
}
