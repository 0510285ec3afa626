//! Window selection for full and incremental runs.
//!
//! Incremental mode keeps only rows on or after `anchor - lookback_days`.
//! Rows before the cutoff are not candidates, so the writer can never touch
//! them in that run; historical backfill must use full mode.

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::model::CombinedDailyMetric;

/// Default trailing window, tolerating data up to a week late.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// What the incremental cutoff is measured back from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// The run's processing date (`as_of_date`).
    #[default]
    ProcessingDate,
    /// The latest `dt` among the combined rows.
    MaxObserved,
}

/// Window strategy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStrategy {
    /// Every combined row is a candidate.
    Full,
    /// Only rows within `lookback_days` of the anchor are candidates.
    Incremental {
        lookback_days: u32,
        anchor: WindowAnchor,
    },
}

impl Default for WindowStrategy {
    fn default() -> Self {
        WindowStrategy::Incremental {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            anchor: WindowAnchor::ProcessingDate,
        }
    }
}

/// Rows selected for the writer plus what was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection {
    pub rows: Vec<CombinedDailyMetric>,
    /// First date inside the window; `None` for full runs and for
    /// max-observed runs with no rows.
    pub cutoff: Option<NaiveDate>,
    pub excluded: usize,
}

/// Pure filter over combined rows.
#[derive(Debug, Clone, Copy)]
pub struct WindowSelector {
    strategy: WindowStrategy,
    as_of_date: NaiveDate,
}

impl WindowSelector {
    pub fn new(strategy: WindowStrategy, as_of_date: NaiveDate) -> Self {
        Self {
            strategy,
            as_of_date,
        }
    }

    pub fn strategy(&self) -> WindowStrategy {
        self.strategy
    }

    /// Compute the cutoff for `rows` without filtering.
    pub fn cutoff(&self, rows: &[CombinedDailyMetric]) -> Option<NaiveDate> {
        match self.strategy {
            WindowStrategy::Full => None,
            WindowStrategy::Incremental {
                lookback_days,
                anchor,
            } => {
                let anchor_date = match anchor {
                    WindowAnchor::ProcessingDate => self.as_of_date,
                    WindowAnchor::MaxObserved => rows.iter().map(|row| row.dt).max()?,
                };
                Some(
                    anchor_date
                        .checked_sub_days(Days::new(u64::from(lookback_days)))
                        .unwrap_or(NaiveDate::MIN),
                )
            }
        }
    }

    /// Keep the rows that belong in this run.
    pub fn select(&self, rows: Vec<CombinedDailyMetric>) -> WindowSelection {
        let total = rows.len();
        let cutoff = self.cutoff(&rows);

        let rows: Vec<CombinedDailyMetric> = match (self.strategy, cutoff) {
            (WindowStrategy::Full, _) => rows,
            (WindowStrategy::Incremental { .. }, Some(cutoff)) => {
                rows.into_iter().filter(|row| row.dt >= cutoff).collect()
            }
            (WindowStrategy::Incremental { .. }, None) => Vec::new(),
        };

        let excluded = total - rows.len();
        debug!(
            cutoff = ?cutoff,
            selected = rows.len(),
            excluded,
            "Window selected"
        );

        WindowSelection {
            rows,
            cutoff,
            excluded,
        }
    }
}
