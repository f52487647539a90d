use std::collections::BTreeMap;
use tracing::debug;

use itemize_core::{day_delta, ChargeTarget, LineItem, Money};

use crate::config::ReconcileConfig;
use crate::group::{GroupKind, OrderGroup};
use crate::ledger::ClaimedItemsLedger;
use crate::result::{Confidence, MatchResult, MatchStrategy, MatchedItem};
use crate::score::{exact_confidence, pick_best, ScoredCandidate, SPLIT_AMBIGUITY_CAP, SPLIT_BASE};

/// Second-priority strategy: one order billed across several charges. Looks
/// for a subset of an order's still-unclaimed items summing exactly to the
/// charge. Only complete-order groups larger than the charge qualify: a
/// partial charge can only come from an order bigger than itself.
pub(crate) fn find_split_match(
    charge: &ChargeTarget,
    groups: &[OrderGroup],
    ledger: &ClaimedItemsLedger,
    config: &ReconcileConfig,
) -> Option<MatchResult> {
    let target = charge.magnitude();
    if !target.is_positive() {
        return None;
    }
    let window = config.split_window();

    let mut scored = Vec::new();
    let mut picks: Vec<(usize, Vec<usize>)> = Vec::new();
    for (gi, group) in groups.iter().enumerate() {
        if group.kind != GroupKind::CompleteOrder {
            continue;
        }
        if group.total <= target {
            continue;
        }
        if !window.contains(charge.date, group.date) {
            continue;
        }

        let pool: Vec<usize> = group
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.amount.is_positive() && ledger.is_unclaimed(&i.id))
            .map(|(p, _)| p)
            .collect();
        let pool_total: Money = pool.iter().map(|&p| group.items[p].amount).sum();
        if pool_total < target {
            continue;
        }

        let Some(subset) = subset_summing(&group.items, &pool, target.cents()) else {
            continue;
        };

        let dd = day_delta(charge.date, group.date);
        let discovery = scored.len();
        scored.push(ScoredCandidate {
            confidence: exact_confidence(SPLIT_BASE, dd),
            date_delta: dd,
            kind: group.kind,
            extra: subset.len(),
            discovery,
        });
        picks.push((gi, subset));
    }

    let (pos, ambiguous) = pick_best(&scored)?;
    let winner = &scored[pos];
    let (gi, subset) = &picks[pos];
    let group = &groups[*gi];
    let chosen: Vec<&LineItem> = subset.iter().map(|&p| &group.items[p]).collect();

    let mut confidence = winner.confidence;
    let mut explanation = format!(
        "{} of {} item(s) on order {} sum to {} (order total {})",
        chosen.len(),
        group.item_count(),
        group.order_ids.join("+"),
        target,
        group.total,
    );
    if ambiguous {
        confidence = confidence.cap(Confidence::from_bps(SPLIT_AMBIGUITY_CAP));
        explanation.push_str("; other candidates scored equally well");
    }

    debug!(
        "charge {}: split payment covers {}/{} items of {} ({})",
        charge.id,
        chosen.len(),
        group.item_count(),
        group.order_ids.join("+"),
        confidence
    );

    Some(MatchResult {
        charge_id: charge.id.clone(),
        matched: true,
        strategy: MatchStrategy::SplitPayment,
        confidence,
        account: Some(group.account.clone()),
        group_kind: Some(group.kind),
        order_ids: group.order_ids.clone(),
        items: chosen.iter().map(|i| MatchedItem::from_line_item(i)).collect(),
        date_delta_days: winner.date_delta,
        amount_delta: Money::ZERO,
        needs_review: false,
        explanation,
    })
}

/// Exact subset-sum over the unclaimed pool, as bounded dynamic programming
/// on reachable cent totals. Orders rarely exceed ~20 items, so the table
/// stays tiny. Per reachable sum the retained subset is the one with the
/// fewest items (then lowest item positions), which makes the final answer
/// both minimal and deterministic.
fn subset_summing(items: &[LineItem], pool: &[usize], target: i64) -> Option<Vec<usize>> {
    let mut reachable: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    reachable.insert(0, Vec::new());

    for &p in pool {
        let cents = items[p].amount.cents();
        let extensions: Vec<(i64, Vec<usize>)> = reachable
            .iter()
            .filter(|&(&sum, _)| sum + cents <= target)
            .map(|(&sum, subset)| {
                let mut extended = subset.clone();
                extended.push(p);
                (sum + cents, extended)
            })
            .collect();
        for (sum, subset) in extensions {
            let keep = match reachable.get(&sum) {
                Some(existing) => prefers(&subset, existing),
                None => true,
            };
            if keep {
                reachable.insert(sum, subset);
            }
        }
    }

    reachable.remove(&target)
}

fn prefers(a: &[usize], b: &[usize]) -> bool {
    a.len() < b.len() || (a.len() == b.len() && a < b)
}
