use serde::{Deserialize, Serialize};
use thiserror::Error;

use itemize_core::{ItemId, LineItem, Money};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocError {
    #[error("Receipt has no items")]
    EmptyReceipt,
    #[error("Negative receipt tax: {0}")]
    NegativeTax(Money),
    #[error("Item amounts sum to {actual}, receipt subtotal is {expected}")]
    SubtotalMismatch { expected: Money, actual: Money },
    #[error("Receipt subtotal must be positive to allocate tax, got {0}")]
    NonPositiveSubtotal(Money),
    #[error("Allocated totals sum to {allocated}, receipt total is {expected}")]
    SumMismatch { allocated: Money, expected: Money },
}

/// One item's share of a receipt-level tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedItem {
    pub item: ItemId,
    pub name: String,
    pub base: Money,
    pub tax: Money,
    pub total: Money,
}

/// Result of spreading a receipt-level tax across its items. Items appear
/// in source order; `total` always equals `subtotal + tax` exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAllocation {
    pub items: Vec<AllocatedItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Distributes a receipt-level tax across line items proportionally, in
/// integer cents: every item gets `floor(base * tax / subtotal)` except one
/// designated item, which absorbs the remainder so the allocation sums to
/// the receipt total exactly. The designated item is the last under a
/// stable order of amount descending, then name, then id, so the choice is
/// deterministic for any input.
///
/// Apple receipts are the motivating case: their emails carry one tax line
/// for the whole receipt, but split generation needs per-item totals.
pub fn spread_receipt_tax(
    items: &[LineItem],
    subtotal: Money,
    tax: Money,
) -> Result<TaxAllocation, AllocError> {
    if items.is_empty() {
        return Err(AllocError::EmptyReceipt);
    }
    if tax.is_negative() {
        return Err(AllocError::NegativeTax(tax));
    }
    let actual: Money = items.iter().map(|i| i.amount).sum();
    if actual != subtotal {
        return Err(AllocError::SubtotalMismatch {
            expected: subtotal,
            actual,
        });
    }
    if !subtotal.is_positive() && !tax.is_zero() {
        return Err(AllocError::NonPositiveSubtotal(subtotal));
    }

    // Positions ordered amount desc, then name, then id; the last one is the
    // remainder-taker.
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[b]
            .amount
            .cmp(&items[a].amount)
            .then_with(|| items[a].name.cmp(&items[b].name))
            .then_with(|| items[a].id.cmp(&items[b].id))
    });
    let designated = *order.last().expect("receipt has items");

    let mut taxes = vec![Money::ZERO; items.len()];
    if !tax.is_zero() {
        let mut allocated = Money::ZERO;
        for &p in &order {
            if p == designated {
                continue;
            }
            let share = (i128::from(items[p].amount.cents()) * i128::from(tax.cents())
                / i128::from(subtotal.cents())) as i64;
            taxes[p] = Money::from_cents(share);
            allocated = allocated + taxes[p];
        }
        taxes[designated] = tax - allocated;
    }

    let allocation = TaxAllocation {
        items: items
            .iter()
            .enumerate()
            .map(|(p, item)| AllocatedItem {
                item: item.id.clone(),
                name: item.name.clone(),
                base: item.amount,
                tax: taxes[p],
                total: item.amount + taxes[p],
            })
            .collect(),
        subtotal,
        tax,
        total: subtotal + tax,
    };

    // Per-item totals must reproduce the receipt total to the cent, or the
    // result is unusable for ledger splits.
    let allocated: Money = allocation.items.iter().map(|i| i.total).sum();
    if allocated != allocation.total {
        return Err(AllocError::SumMismatch {
            allocated,
            expected: allocation.total,
        });
    }

    Ok(allocation)
}
