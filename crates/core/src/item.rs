use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

/// Stable identity of a line item within one batch: which account's export
/// it came from, which order/receipt it belongs to, and its row ordinal in
/// the export. The claimed-items ledger is keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub account: String,
    pub order: String,
    pub row: usize,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.account, self.order, self.row)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemError {
    #[error("Missing order id")]
    MissingOrderId,
    #[error("Missing product name")]
    MissingName,
    #[error("Quantity must be at least 1, got {0}")]
    BadQuantity(i64),
    #[error("Negative item amount: {0}")]
    NegativeAmount(Money),
    #[error("Item has neither a ship date nor an order date")]
    MissingDate,
}

/// One row of a source export (Amazon order-history CSV, parsed Apple
/// receipt) before validation. Field layout mirrors what the extraction
/// collaborators hand over; `validate` turns it into a `LineItem` or reports
/// why the row is unusable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub order_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub amount: Money,
    /// Per-item tax when the source itemizes it; absent for Apple receipts
    /// that only carry receipt-level tax.
    pub tax: Option<Money>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
}

impl RawItem {
    pub fn validate(self, account: &str, row: usize) -> Result<LineItem, ItemError> {
        if self.order_id.trim().is_empty() {
            return Err(ItemError::MissingOrderId);
        }
        if self.name.trim().is_empty() {
            return Err(ItemError::MissingName);
        }
        if self.quantity < 1 {
            return Err(ItemError::BadQuantity(self.quantity));
        }
        if self.amount.is_negative() {
            return Err(ItemError::NegativeAmount(self.amount));
        }
        if self.ship_date.is_none() && self.order_date.is_none() {
            return Err(ItemError::MissingDate);
        }

        Ok(LineItem {
            id: ItemId {
                account: account.to_string(),
                order: self.order_id,
                row,
            },
            name: self.name,
            quantity: self.quantity as u32,
            unit_price: self.unit_price,
            amount: self.amount,
            tax: self.tax,
            order_date: self.order_date,
            ship_date: self.ship_date,
        })
    }
}

/// A validated purchase line. Immutable once constructed; only
/// `RawItem::validate` builds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub amount: Money,
    pub tax: Option<Money>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
}

impl LineItem {
    pub fn account(&self) -> &str {
        &self.id.account
    }

    pub fn order_id(&self) -> &str {
        &self.id.order
    }

    /// The date this item is grouped under: ship date when known, otherwise
    /// the order/purchase date (Apple receipts never ship).
    pub fn group_date(&self) -> NaiveDate {
        match (self.ship_date, self.order_date) {
            (Some(d), _) => d,
            (None, Some(d)) => d,
            // validate() guarantees one of the two is present
            (None, None) => unreachable!("LineItem constructed without a date"),
        }
    }
}

/// One source account's full export, as delivered by an extraction
/// collaborator. Multi-account households supply one of these per account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountExport {
    pub account: String,
    pub rows: Vec<RawItem>,
}

impl AccountExport {
    pub fn new(account: impl Into<String>, rows: Vec<RawItem>) -> Self {
        AccountExport {
            account: account.into(),
            rows,
        }
    }
}
