//! Reading progress tracking and derived statistics.

pub mod progress;
mod service;
pub mod stats;

pub use progress::{ProgressReport, ProgressWrite};
pub use service::ReadingService;
pub use stats::{DailyPages, HeatmapDay, ReadingStats, WeeklyPages};

use serde::{Deserialize, Serialize};

/// Resolution of two progress reports racing for the same book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The later write replaces the earlier one.
    #[default]
    LastWriteWins,
    /// Updates must name the version they were based on.
    VersionChecked,
}
