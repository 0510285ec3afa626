//! Run parameters.

use chrono::NaiveDate;
use serde::Deserialize;

use super::ConfigError;
use crate::window::{WindowAnchor, WindowSelector, WindowStrategy, DEFAULT_LOOKBACK_DAYS};

/// Run mode discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Rebuild every key; used for first loads and backfills.
    Full,
    /// Re-process only the trailing window.
    #[default]
    Incremental,
}

/// Parameters for one pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Full rebuild or trailing window.
    pub mode: RunMode,
    /// Days before the anchor included in an incremental run.
    /// Default: 7
    pub lookback_days: u32,
    /// Processing date. None = today (UTC).
    pub as_of_date: Option<NaiveDate>,
    /// Whether the window trails the processing date or the newest data.
    /// Default: processing_date
    pub anchor: WindowAnchor,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Incremental,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            as_of_date: None,
            anchor: WindowAnchor::ProcessingDate,
        }
    }
}

impl RunConfig {
    pub fn full() -> Self {
        Self {
            mode: RunMode::Full,
            ..Self::default()
        }
    }

    pub fn incremental(lookback_days: u32) -> Self {
        Self {
            mode: RunMode::Incremental,
            lookback_days,
            ..Self::default()
        }
    }

    pub fn with_as_of_date(mut self, as_of_date: NaiveDate) -> Self {
        self.as_of_date = Some(as_of_date);
        self
    }

    pub fn with_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == RunMode::Incremental && self.lookback_days == 0 {
            return Err(ConfigError::Invalid(
                "run.lookback_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The processing date, defaulting to today (UTC).
    pub fn as_of(&self) -> NaiveDate {
        self.as_of_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    pub fn strategy(&self) -> WindowStrategy {
        match self.mode {
            RunMode::Full => WindowStrategy::Full,
            RunMode::Incremental => WindowStrategy::Incremental {
                lookback_days: self.lookback_days,
                anchor: self.anchor,
            },
        }
    }

    pub fn selector(&self) -> WindowSelector {
        WindowSelector::new(self.strategy(), self.as_of())
    }
}
