use serde::{Deserialize, Serialize};
use thiserror::Error;

use itemize_core::{DateWindow, Money};

use crate::result::Confidence;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Knobs for one reconciliation batch. Everything is passed explicitly to
/// the engine; there is no global state, so two batches with different
/// settings can run back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// ± window for the complete-match strategy.
    pub complete_window_days: u32,
    /// ± window for split-payment candidates, measured against the order
    /// date (partial charges trail the order by several days).
    pub split_window_days: u32,
    /// ± window for the fuzzy strategy.
    pub fuzzy_window_days: u32,
    /// Absolute amount band the fuzzy strategy tolerates.
    pub fuzzy_tolerance: Money,
    /// Split-payment search is the most expensive and riskiest strategy;
    /// batch-level switch to run without it.
    pub split_enabled: bool,
    /// Results below this are flagged `needs_review` instead of being
    /// trusted for automatic split application.
    pub review_threshold: Confidence,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            complete_window_days: 3,
            split_window_days: 7,
            fuzzy_window_days: 5,
            fuzzy_tolerance: Money::from_cents(2),
            split_enabled: true,
            review_threshold: Confidence::from_bps(9_000),
        }
    }
}

impl ReconcileConfig {
    /// Amazon order-history exports: shipments drive charge timing, so the
    /// defaults fit as-is.
    pub fn amazon() -> Self {
        Self::default()
    }

    /// Apple receipt emails: receipts can trail the consolidated charge by
    /// several days, so both windows widen.
    pub fn apple() -> Self {
        Self {
            complete_window_days: 5,
            fuzzy_window_days: 7,
            ..Self::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn complete_window(&self) -> DateWindow {
        DateWindow::new(self.complete_window_days)
    }

    pub fn split_window(&self) -> DateWindow {
        DateWindow::new(self.split_window_days)
    }

    pub fn fuzzy_window(&self) -> DateWindow {
        DateWindow::new(self.fuzzy_window_days)
    }
}
