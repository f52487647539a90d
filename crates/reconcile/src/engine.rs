use serde::Serialize;
use thiserror::Error;
use tracing::info;

use itemize_core::{AccountExport, ChargeTarget};

use crate::config::ReconcileConfig;
use crate::group::{build_groups, GroupError, OrderGroup};
use crate::ledger::{ClaimError, ClaimedItemsLedger};
use crate::result::{MatchResult, MatchStrategy};
use crate::strategy::{find_complete_match, find_fuzzy_match, find_split_match, AmountIndex};

/// A failed arithmetic invariant. Data-quality problems never land here
/// (they are skipped and counted); a broken invariant stops the batch
/// before anything downstream writes a wrong split.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// Batch-level tallies over the match results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub charges: usize,
    pub matched: usize,
    pub complete: usize,
    pub split_payment: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
    pub needs_review: usize,
    pub skipped_items: usize,
    /// matched / charges, in basis points.
    pub match_rate_bps: u16,
    /// Matched-result confidences in 2000-bps buckets:
    /// [0,2000) [2000,4000) [4000,6000) [6000,8000) [8000,10000].
    pub confidence_buckets: [usize; 5],
}

impl BatchStats {
    fn collect(results: &[MatchResult], skipped_items: usize) -> Self {
        let mut stats = BatchStats {
            charges: results.len(),
            matched: 0,
            complete: 0,
            split_payment: 0,
            fuzzy: 0,
            unmatched: 0,
            needs_review: 0,
            skipped_items,
            match_rate_bps: 0,
            confidence_buckets: [0; 5],
        };
        for result in results {
            match result.strategy {
                MatchStrategy::Complete => stats.complete += 1,
                MatchStrategy::SplitPayment => stats.split_payment += 1,
                MatchStrategy::Fuzzy => stats.fuzzy += 1,
                MatchStrategy::None => stats.unmatched += 1,
            }
            if result.matched {
                stats.matched += 1;
                let bucket = usize::from(result.confidence.bps() / 2_000).min(4);
                stats.confidence_buckets[bucket] += 1;
            }
            if result.needs_review {
                stats.needs_review += 1;
            }
        }
        if stats.charges > 0 {
            stats.match_rate_bps = (stats.matched * 10_000 / stats.charges) as u16;
        }
        stats
    }
}

/// Everything one batch run produces: per-charge results in processing
/// (date-ascending) order, tallies, and the malformed-row warnings.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<MatchResult>,
    pub stats: BatchStats,
    pub warnings: Vec<String>,
}

impl BatchReport {
    /// The artifact handed to the split-generation collaborator.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the strategy cascade over a batch of charges. Strategies run in
/// fixed priority order (complete, then split payment, then fuzzy) and
/// each later strategy is only consulted when the earlier ones fail.
pub struct ReconcileEngine {
    config: ReconcileConfig,
}

impl ReconcileEngine {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn amazon() -> Self {
        Self::new(ReconcileConfig::amazon())
    }

    pub fn apple() -> Self {
        Self::new(ReconcileConfig::apple())
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Matches every charge against every account's candidate groups.
    ///
    /// Charges are processed in ascending date order regardless of input
    /// order: the claimed-items ledger is threaded through sequentially, so
    /// an earlier charge must claim its items before a later charge of the
    /// same order is considered.
    pub fn run(
        &self,
        charges: &[ChargeTarget],
        exports: &[AccountExport],
    ) -> Result<BatchReport, ReconcileError> {
        let mut groups: Vec<OrderGroup> = Vec::new();
        let mut skipped = 0;
        let mut warnings = Vec::new();
        for export in exports {
            let grouping = build_groups(export);
            skipped += grouping.skipped;
            warnings.extend(grouping.warnings);
            groups.extend(grouping.groups);
        }
        for group in &groups {
            group.verify_total()?;
        }

        let index = AmountIndex::build(&groups);

        let mut ordered: Vec<&ChargeTarget> = charges.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let mut ledger = ClaimedItemsLedger::new();
        let mut results = Vec::with_capacity(ordered.len());
        for charge in ordered {
            let mut result =
                match find_complete_match(charge, &groups, &index, &ledger, &self.config) {
                    Some(r) => r,
                    None => {
                        let split = if self.config.split_enabled {
                            find_split_match(charge, &groups, &ledger, &self.config)
                        } else {
                            None
                        };
                        match split {
                            Some(r) => r,
                            None => find_fuzzy_match(charge, &groups, &ledger, &self.config)
                                .unwrap_or_else(|| MatchResult::unmatched(charge)),
                        }
                    }
                };

            for item in &result.items {
                ledger.claim_full(&item.item, item.amount)?;
            }
            result.needs_review =
                result.matched && result.confidence < self.config.review_threshold;
            results.push(result);
        }

        let stats = BatchStats::collect(&results, skipped);
        info!(
            "reconciled {}/{} charges ({} complete, {} split, {} fuzzy), {} need review, {} rows skipped",
            stats.matched,
            stats.charges,
            stats.complete,
            stats.split_payment,
            stats.fuzzy,
            stats.needs_review,
            stats.skipped_items
        );

        Ok(BatchReport {
            results,
            stats,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use itemize_core::{Money, RawItem};

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

    #[test]
    fn complete_outranks_fuzzy_when_both_qualify() {
        // The 4599 order qualifies for complete; a 4600 order would only
        // qualify fuzzily. Priority must pick complete.
        let exports = vec![AccountExport::new(
            "kate",
            vec![
                raw("112-001", "cable", 4599, (2024, 7, 14)),
                raw("112-002", "other", 4600, (2024, 7, 14)),
            ],
        )];
        let report = ReconcileEngine::amazon()
            .run(&[charge("t1", 4599, (2024, 7, 14))], &exports)
            .unwrap();
        assert_eq!(report.results[0].strategy, MatchStrategy::Complete);
        assert_eq!(report.results[0].order_ids, vec!["112-001"]);
    }

    #[test]
    fn charges_are_processed_in_date_order() {
        // Input deliberately newest-first; the 3000 charge (earlier) must
        // claim its subset before the 5000 charge is considered.
        let exports = vec![AccountExport::new(
            "kate",
            vec![
                raw("112-001", "keyboard", 3000, (2024, 7, 14)),
                raw("112-001", "monitor", 5000, (2024, 7, 14)),
            ],
        )];
        let charges = vec![
            charge("t2", 5000, (2024, 7, 18)),
            charge("t1", 3000, (2024, 7, 15)),
        ];
        let report = ReconcileEngine::amazon().run(&charges, &exports).unwrap();
        assert_eq!(report.results[0].charge_id, "t1");
        assert_eq!(report.results[0].strategy, MatchStrategy::SplitPayment);
        assert_eq!(report.results[1].charge_id, "t2");
        assert_eq!(report.results[1].strategy, MatchStrategy::SplitPayment);
    }

    #[test]
    fn split_can_be_disabled() {
        let exports = vec![AccountExport::new(
            "kate",
            vec![
                raw("112-001", "keyboard", 3000, (2024, 7, 14)),
                raw("112-001", "monitor", 5000, (2024, 7, 14)),
            ],
        )];
        let config = ReconcileConfig {
            split_enabled: false,
            ..ReconcileConfig::default()
        };
        let report = ReconcileEngine::new(config)
            .run(&[charge("t1", 3000, (2024, 7, 14))], &exports)
            .unwrap();
        assert_eq!(report.results[0].strategy, MatchStrategy::None);
        assert!(!report.results[0].matched);
    }

    #[test]
    fn winning_account_is_recorded() {
        let exports = vec![
            AccountExport::new("kate", vec![raw("112-001", "cable", 2000, (2024, 7, 14))]),
            AccountExport::new("sam", vec![raw("114-001", "book", 4599, (2024, 7, 14))]),
        ];
        let report = ReconcileEngine::amazon()
            .run(&[charge("t1", 4599, (2024, 7, 14))], &exports)
            .unwrap();
        assert_eq!(report.results[0].account.as_deref(), Some("sam"));
    }

    #[test]
    fn low_confidence_results_are_flagged_for_review() {
        let exports = vec![AccountExport::new(
            "kate",
            vec![raw("112-001", "cable", 5002, (2024, 7, 14))],
        )];
        let report = ReconcileEngine::amazon()
            .run(&[charge("t1", 5000, (2024, 7, 14))], &exports)
            .unwrap();
        let result = &report.results[0];
        assert_eq!(result.strategy, MatchStrategy::Fuzzy);
        assert!(result.needs_review);
    }

    #[test]
    fn stats_tally_strategies_and_skips() {
        let mut bad = raw("112-009", "ghost", 100, (2024, 7, 14));
        bad.order_id = String::new();
        let exports = vec![AccountExport::new(
            "kate",
            vec![
                raw("112-001", "cable", 4599, (2024, 7, 14)),
                raw("112-002", "keyboard", 3000, (2024, 7, 15)),
                raw("112-002", "monitor", 5000, (2024, 7, 15)),
                bad,
            ],
        )];
        let charges = vec![
            charge("t1", 4599, (2024, 7, 14)),
            charge("t2", 3000, (2024, 7, 15)),
            charge("t3", 777, (2024, 7, 16)),
        ];
        let report = ReconcileEngine::amazon().run(&charges, &exports).unwrap();
        let stats = &report.stats;
        assert_eq!(stats.charges, 3);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.complete, 1);
        assert_eq!(stats.split_payment, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.skipped_items, 1);
        assert_eq!(stats.match_rate_bps, 6_666);
        assert_eq!(report.warnings.len(), 1);
        // 10000-bps and 9000-bps matches both land in the top bucket.
        assert_eq!(stats.confidence_buckets[4], 2);
    }

    #[test]
    fn report_serializes_to_json() {
        let exports = vec![AccountExport::new(
            "kate",
            vec![raw("112-001", "cable", 4599, (2024, 7, 14))],
        )];
        let report = ReconcileEngine::amazon()
            .run(&[charge("t1", 4599, (2024, 7, 14))], &exports)
            .unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"strategy\": \"complete\""));
        assert!(json.contains("\"match_rate_bps\": 10000"));
    }

    #[test]
    fn empty_batch_is_fine() {
        let report = ReconcileEngine::amazon().run(&[], &[]).unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.stats.match_rate_bps, 0);
    }
}
