pub mod allocate;
pub mod config;
pub mod engine;
pub mod group;
pub mod ledger;
pub mod payee;
pub mod result;
pub(crate) mod score;
pub(crate) mod strategy;

pub use allocate::{spread_receipt_tax, AllocError, AllocatedItem, TaxAllocation};
pub use config::{ConfigError, ReconcileConfig};
pub use engine::{BatchReport, BatchStats, ReconcileEngine, ReconcileError};
pub use group::{build_groups, GroupError, GroupKind, Grouping, OrderGroup};
pub use ledger::{ClaimError, ClaimedItemsLedger};
pub use payee::{PayeeClassifier, PayeeFamily};
pub use result::{Confidence, MatchResult, MatchStrategy, MatchedItem};
