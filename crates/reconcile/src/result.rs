use serde::{Deserialize, Serialize};
use std::fmt;

use itemize_core::{ChargeTarget, ItemId, LineItem, Money};

use crate::group::GroupKind;

/// Match certainty in integer basis points, 0..=10000. Kept integral so a
/// result can be compared and serialized without float drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Confidence(u16);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const MAX: Confidence = Confidence(10_000);

    /// Clamps to the valid range; out-of-range deserialized values are
    /// rejected instead (see `TryFrom`).
    pub fn from_bps(bps: u16) -> Self {
        Confidence(bps.min(10_000))
    }

    pub fn bps(self) -> u16 {
        self.0
    }

    pub fn saturating_sub(self, penalty: u16) -> Self {
        Confidence(self.0.saturating_sub(penalty))
    }

    pub fn cap(self, max: Confidence) -> Self {
        Confidence(self.0.min(max.0))
    }
}

impl TryFrom<u16> for Confidence {
    type Error = String;

    fn try_from(bps: u16) -> Result<Self, Self::Error> {
        if bps > 10_000 {
            return Err(format!("confidence must be at most 10000 bps, got {bps}"));
        }
        Ok(Confidence(bps))
    }
}

impl From<Confidence> for u16 {
    fn from(c: Confidence) -> u16 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Complete,
    SplitPayment,
    Fuzzy,
    None,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Complete => write!(f, "complete"),
            MatchStrategy::SplitPayment => write!(f, "split_payment"),
            MatchStrategy::Fuzzy => write!(f, "fuzzy"),
            MatchStrategy::None => write!(f, "none"),
        }
    }
}

/// One line item attributed to a charge, with the amount the attribution
/// covers. Split generation consumes this per-item breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedItem {
    pub item: ItemId,
    pub name: String,
    pub amount: Money,
    pub tax: Option<Money>,
}

impl MatchedItem {
    pub(crate) fn from_line_item(item: &LineItem) -> Self {
        MatchedItem {
            item: item.id.clone(),
            name: item.name.clone(),
            amount: item.amount,
            tax: item.tax,
        }
    }
}

/// Outcome of attempting to explain one charge. Immutable once built;
/// exactly one is produced per charge per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub charge_id: String,
    pub matched: bool,
    pub strategy: MatchStrategy,
    pub confidence: Confidence,
    /// Which source account's data produced the winning candidate.
    pub account: Option<String>,
    pub group_kind: Option<GroupKind>,
    pub order_ids: Vec<String>,
    pub items: Vec<MatchedItem>,
    /// Signed days from the candidate's date to the charge date.
    pub date_delta_days: i64,
    /// Charge magnitude minus candidate total; zero except for fuzzy.
    pub amount_delta: Money,
    pub needs_review: bool,
    pub explanation: String,
}

impl MatchResult {
    pub fn unmatched(charge: &ChargeTarget) -> Self {
        MatchResult {
            charge_id: charge.id.clone(),
            matched: false,
            strategy: MatchStrategy::None,
            confidence: Confidence::ZERO,
            account: None,
            group_kind: None,
            order_ids: Vec::new(),
            items: Vec::new(),
            date_delta_days: 0,
            amount_delta: Money::ZERO,
            needs_review: false,
            explanation: format!("no candidate explains {}", charge.magnitude()),
        }
    }
}
