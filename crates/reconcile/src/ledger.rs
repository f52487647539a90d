use std::collections::HashMap;
use thiserror::Error;

use itemize_core::{ItemId, LineItem, Money};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("Item {item} is already claimed for {claimed}")]
    AlreadyClaimed { item: ItemId, claimed: Money },
}

/// Batch-lifetime record of which line items have been attributed to a
/// charge, and for how much. Owned by the engine; strategies only read it.
/// Discarded when the batch ends; the next run starts fresh from source
/// data.
#[derive(Debug, Default)]
pub struct ClaimedItemsLedger {
    claimed: HashMap<ItemId, Money>,
}

impl ClaimedItemsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claimed(&self, id: &ItemId) -> Money {
        self.claimed.get(id).copied().unwrap_or(Money::ZERO)
    }

    pub fn is_unclaimed(&self, id: &ItemId) -> bool {
        self.claimed(id).is_zero()
    }

    pub fn remaining(&self, item: &LineItem) -> Money {
        item.amount - self.claimed(&item.id)
    }

    /// Attributes an item, in full, to the charge currently being processed.
    /// Claiming an item twice would double-count it in two splits, so a
    /// second claim is an error rather than an accumulation.
    pub fn claim_full(&mut self, id: &ItemId, amount: Money) -> Result<(), ClaimError> {
        let prior = self.claimed(id);
        if !prior.is_zero() {
            return Err(ClaimError::AlreadyClaimed {
                item: id.clone(),
                claimed: prior,
            });
        }
        self.claimed.insert(id.clone(), amount);
        Ok(())
    }

    pub fn claim_count(&self) -> usize {
        self.claimed.len()
    }
}
