use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// A consolidated card transaction to be explained by one or more
/// orders/receipts. Read-only input; the YNAB sign convention is negative
/// for expenses, so comparisons go through `magnitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeTarget {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub payee: String,
    pub account_name: String,
}

impl ChargeTarget {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        amount: Money,
        payee: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        ChargeTarget {
            id: id.into(),
            date,
            amount,
            payee: payee.into(),
            account_name: account_name.into(),
        }
    }

    /// Positive comparison amount, regardless of the ledger's sign
    /// convention.
    pub fn magnitude(&self) -> Money {
        self.amount.abs()
    }
}
