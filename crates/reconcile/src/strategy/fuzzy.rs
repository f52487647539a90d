use tracing::debug;

use itemize_core::{day_delta, ChargeTarget};

use crate::config::ReconcileConfig;
use crate::group::OrderGroup;
use crate::ledger::ClaimedItemsLedger;
use crate::result::{Confidence, MatchResult, MatchStrategy, MatchedItem};
use crate::score::{fuzzy_confidence, pick_best, ScoredCandidate, FUZZY_AMBIGUITY_CAP};

/// Last-resort strategy: tolerates a few cents of drift and a wider date
/// window, at a confidence ceiling below every exact strategy. Catches
/// currency rounding between source systems and slow settlements.
pub(crate) fn find_fuzzy_match(
    charge: &ChargeTarget,
    groups: &[OrderGroup],
    ledger: &ClaimedItemsLedger,
    config: &ReconcileConfig,
) -> Option<MatchResult> {
    let target = charge.magnitude();
    let window = config.fuzzy_window();

    let mut scored = Vec::new();
    let mut group_indices = Vec::new();
    for (gi, group) in groups.iter().enumerate() {
        let amount_delta = target - group.total;
        if amount_delta.abs() > config.fuzzy_tolerance {
            continue;
        }
        if !window.contains(charge.date, group.date) {
            continue;
        }
        if !group.items.iter().all(|i| ledger.is_unclaimed(&i.id)) {
            continue;
        }
        let dd = day_delta(charge.date, group.date);
        let discovery = scored.len();
        scored.push(ScoredCandidate {
            confidence: fuzzy_confidence(amount_delta.cents().unsigned_abs(), dd),
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
    let amount_delta = target - group.total;

    let mut confidence = winner.confidence;
    let mut explanation = format!(
        "{} {} totals {}, off by {} and {} day(s)",
        group.kind,
        group.order_ids.join("+"),
        group.total,
        amount_delta.abs(),
        winner.date_delta.abs(),
    );
    if ambiguous {
        confidence = confidence.cap(Confidence::from_bps(FUZZY_AMBIGUITY_CAP));
        explanation.push_str("; other candidates scored equally well");
    }

    debug!(
        "charge {}: fuzzy match on {} ({})",
        charge.id,
        group.order_ids.join("+"),
        confidence
    );

    Some(MatchResult {
        charge_id: charge.id.clone(),
        matched: true,
        strategy: MatchStrategy::Fuzzy,
        confidence,
        account: Some(group.account.clone()),
        group_kind: Some(group.kind),
        order_ids: group.order_ids.clone(),
        items: group.items.iter().map(MatchedItem::from_line_item).collect(),
        date_delta_days: winner.date_delta,
        amount_delta,
        needs_review: false,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::build_groups;
    use crate::score::FUZZY_BASE;
    use chrono::NaiveDate;
    use itemize_core::{AccountExport, Money, RawItem};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(order: &str, name: &str, cents: i64, ship: (i32, u32, u32)) -> RawItem {
        RawItem {
            order_id: order.to_string(),
            name: name.to_string(),
            quantity: 1,
            unit_price: Money::from_cents(cents),
            amount: Money::from_cents(cents),
            tax: None,
            order_date: None,
            ship_date: Some(date(ship.0, ship.1, ship.2)),
        }
    }

    fn charge(id: &str, cents: i64, on: (i32, u32, u32)) -> ChargeTarget {
        ChargeTarget::new(
            id,
            date(on.0, on.1, on.2),
            Money::from_cents(-cents),
            "AMZN Mktp US",
            "Visa",
        )
    }

    fn setup(rows: Vec<RawItem>) -> Vec<OrderGroup> {
        build_groups(&AccountExport::new("kate", rows)).groups
    }

    #[test]
    fn tolerates_small_amount_drift() {
        let groups = setup(vec![raw("112-001", "cable", 5002, (2024, 7, 13))]);
        let ledger = ClaimedItemsLedger::new();
        let result = find_fuzzy_match(
            &charge("t1", 5000, (2024, 7, 14)),
            &groups,
            &ledger,
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(result.strategy, MatchStrategy::Fuzzy);
        assert_eq!(result.amount_delta.cents(), -2);
        assert_eq!(result.date_delta_days, 1);
        assert_eq!(result.confidence.bps(), 8_000 - 200 - 150);
    }

    #[test]
    fn rejects_drift_beyond_tolerance() {
        let groups = setup(vec![raw("112-001", "cable", 5005, (2024, 7, 14))]);
        let ledger = ClaimedItemsLedger::new();
        assert!(find_fuzzy_match(
            &charge("t1", 5000, (2024, 7, 14)),
            &groups,
            &ledger,
            &ReconcileConfig::default(),
        )
        .is_none());
    }

    #[test]
    fn wider_window_than_complete() {
        // 5 days off: outside the complete window, inside the fuzzy one.
        let groups = setup(vec![raw("112-001", "cable", 5000, (2024, 7, 14))]);
        let ledger = ClaimedItemsLedger::new();
        let result = find_fuzzy_match(
            &charge("t1", 5000, (2024, 7, 19)),
            &groups,
            &ledger,
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(result.confidence.bps(), FUZZY_BASE - 5 * 150);
    }

    #[test]
    fn confidence_never_reaches_exact_band() {
        let groups = setup(vec![raw("112-001", "cable", 5000, (2024, 7, 14))]);
        let ledger = ClaimedItemsLedger::new();
        let result = find_fuzzy_match(
            &charge("t1", 5000, (2024, 7, 14)),
            &groups,
            &ledger,
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(result.confidence.bps(), FUZZY_BASE);
    }

    #[test]
    fn claimed_groups_are_skipped() {
        let groups = setup(vec![raw("112-001", "cable", 5002, (2024, 7, 14))]);
        let mut ledger = ClaimedItemsLedger::new();
        let item = &groups[0].items[0];
        ledger.claim_full(&item.id, item.amount).unwrap();
        assert!(find_fuzzy_match(
            &charge("t1", 5000, (2024, 7, 14)),
            &groups,
            &ledger,
            &ReconcileConfig::default(),
        )
        .is_none());
    }
}
