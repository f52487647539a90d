//! Confidence arithmetic and candidate selection shared by the strategies.
//!
//! The penalty table is arranged so the three strategies occupy disjoint
//! confidence bands: a complete match scores at least 9300, a split match at
//! most 9000 and at least 8300, a fuzzy match at most 8000. Strategy
//! priority therefore also orders confidence.

use crate::group::GroupKind;
use crate::result::Confidence;

pub(crate) const COMPLETE_BASE: u16 = 10_000;
pub(crate) const SPLIT_BASE: u16 = 9_000;
pub(crate) const FUZZY_BASE: u16 = 8_000;
pub(crate) const FUZZY_FLOOR: u16 = 5_000;

/// Caps applied when more than one equally-good candidate survives the
/// tie-break, flagging the pick for human review.
pub(crate) const COMPLETE_AMBIGUITY_CAP: u16 = 9_500;
pub(crate) const SPLIT_AMBIGUITY_CAP: u16 = 8_500;
pub(crate) const FUZZY_AMBIGUITY_CAP: u16 = 7_500;

pub(crate) const FUZZY_CENT_PENALTY: u64 = 100;
pub(crate) const FUZZY_DAY_PENALTY: u64 = 150;

/// Step-function date penalty for exact-amount strategies.
pub(crate) fn date_penalty(delta_days: u64) -> u16 {
    match delta_days {
        0 => 0,
        1 => 200,
        2 => 400,
        _ => 700,
    }
}

pub(crate) fn exact_confidence(base: u16, date_delta: i64) -> Confidence {
    Confidence::from_bps(base).saturating_sub(date_penalty(date_delta.unsigned_abs()))
}

pub(crate) fn fuzzy_confidence(amount_delta_cents: u64, date_delta: i64) -> Confidence {
    let penalty = amount_delta_cents * FUZZY_CENT_PENALTY
        + date_delta.unsigned_abs() * FUZZY_DAY_PENALTY;
    let penalty = u16::try_from(penalty).unwrap_or(u16::MAX);
    let bps = FUZZY_BASE.saturating_sub(penalty).max(FUZZY_FLOOR);
    Confidence::from_bps(bps)
}

/// One scored candidate, carrying everything the tie-break needs.
/// `extra` is a strategy-specific key (subset size for split payments,
/// zero elsewhere); `discovery` is the first-seen position and breaks
/// whatever the other keys cannot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoredCandidate {
    pub confidence: Confidence,
    pub date_delta: i64,
    pub kind: GroupKind,
    pub extra: usize,
    pub discovery: usize,
}

impl ScoredCandidate {
    /// The keys a candidate must win on to be unambiguously best;
    /// `discovery` is deliberately excluded so first-seen picks among true
    /// ties are detectable as ambiguous.
    fn strength(&self) -> (u16, u64, u8, usize) {
        (
            self.confidence.bps(),
            self.date_delta.unsigned_abs(),
            self.kind.rank(),
            self.extra,
        )
    }

    fn sort_key(&self) -> (std::cmp::Reverse<u16>, u64, u8, usize, usize) {
        (
            std::cmp::Reverse(self.confidence.bps()),
            self.date_delta.unsigned_abs(),
            self.kind.rank(),
            self.extra,
            self.discovery,
        )
    }
}

/// Selects the winner per the tie-break rule: confidence, then closest date,
/// then group-kind preference, then the strategy key, then first seen.
/// Returns the winner's position in `candidates` and whether another
/// candidate tied it on everything but discovery order.
pub(crate) fn pick_best(candidates: &[ScoredCandidate]) -> Option<(usize, bool)> {
    let best = candidates
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.sort_key())?;
    let ambiguous = candidates
        .iter()
        .enumerate()
        .any(|(i, c)| i != best.0 && c.strength() == best.1.strength());
    Some((best.0, ambiguous))
}
