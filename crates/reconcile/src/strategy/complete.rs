use std::collections::HashMap;
use tracing::debug;

use itemize_core::{day_delta, ChargeTarget, Money};

use crate::config::ReconcileConfig;
use crate::group::OrderGroup;
use crate::ledger::ClaimedItemsLedger;
use crate::result::{Confidence, MatchResult, MatchStrategy, MatchedItem};
use crate::score::{
    exact_confidence, pick_best, ScoredCandidate, COMPLETE_AMBIGUITY_CAP, COMPLETE_BASE,
};

/// Exact-amount lookup table over all candidate groups, built once per
/// batch so each charge resolves in O(candidates-at-that-amount).
#[derive(Debug)]
pub(crate) struct AmountIndex {
    by_amount: HashMap<Money, Vec<usize>>,
}

impl AmountIndex {
    pub(crate) fn build(groups: &[OrderGroup]) -> Self {
        let mut by_amount: HashMap<Money, Vec<usize>> = HashMap::new();
        for (i, group) in groups.iter().enumerate() {
            by_amount.entry(group.total).or_default().push(i);
        }
        AmountIndex { by_amount }
    }

    pub(crate) fn candidates(&self, amount: Money) -> &[usize] {
        self.by_amount
            .get(&amount)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Highest-confidence strategy: a group whose total equals the charge
/// exactly, inside the tight date window. Groups that already lost an item
/// to an earlier charge are out of the running.
pub(crate) fn find_complete_match(
    charge: &ChargeTarget,
    groups: &[OrderGroup],
    index: &AmountIndex,
    ledger: &ClaimedItemsLedger,
    config: &ReconcileConfig,
) -> Option<MatchResult> {
    let target = charge.magnitude();
    let window = config.complete_window();

    let mut scored = Vec::new();
    let mut group_indices = Vec::new();
    for (discovery, &gi) in index.candidates(target).iter().enumerate() {
        let group = &groups[gi];
        if !window.contains(charge.date, group.date) {
            continue;
        }
        if !group.items.iter().all(|i| ledger.is_unclaimed(&i.id)) {
            continue;
        }
        let dd = day_delta(charge.date, group.date);
        scored.push(ScoredCandidate {
            confidence: exact_confidence(COMPLETE_BASE, dd),
            date_delta: dd,
            kind: group.kind,
            extra: 0,
            discovery,
        });
        group_indices.push(gi);
    }

    let (pos, ambiguous) = pick_best(&scored)?;
    let winner = &scored[pos];
    let group = &groups[group_indices[pos]];

    let mut confidence = winner.confidence;
    let mut explanation = format!(
        "{} {} totals {} exactly, {} day(s) from charge",
        group.kind,
        group.order_ids.join("+"),
        group.total,
        winner.date_delta.abs(),
    );
    if ambiguous {
        confidence = confidence.cap(Confidence::from_bps(COMPLETE_AMBIGUITY_CAP));
        explanation.push_str("; other candidates scored equally well");
    }

    debug!(
        "charge {}: complete match on {} ({})",
        charge.id,
        group.order_ids.join("+"),
        confidence
    );

    Some(MatchResult {
        charge_id: charge.id.clone(),
        matched: true,
        strategy: MatchStrategy::Complete,
        confidence,
        account: Some(group.account.clone()),
        group_kind: Some(group.kind),
        order_ids: group.order_ids.clone(),
        items: group.items.iter().map(MatchedItem::from_line_item).collect(),
        date_delta_days: winner.date_delta,
        amount_delta: Money::ZERO,
        needs_review: false,
        explanation,
    })
}
