//! Line item and document total computation
//!
//! One formula is used for every document kind:
//!
//! ```text
//! gross  = round(quantity * rate)
//! net    = gross - discount
//! tax    = round(net * tax_rate / 100)
//! amount = net + tax
//! ```
//!
//! Rounding is half-up to the configured scale. Document totals are plain sums
//! of the rounded per-line figures, so `total == Σ amount` always holds.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Computed figures for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub gross: BigDecimal,
    pub net: BigDecimal,
    pub tax: BigDecimal,
    pub amount: BigDecimal,
}

/// Derived header totals of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
}

/// Validate a line item and compute its amounts
pub fn compute_line(item: &LineItem, scale: i64) -> LedgerResult<LineAmounts> {
    let zero = BigDecimal::from(0);
    let hundred = BigDecimal::from(100);

    if item.item.trim().is_empty() {
        return Err(LedgerError::validation("Line item must reference an item"));
    }

    if item.quantity <= zero {
        return Err(LedgerError::validation(format!(
            "Quantity for '{}' must be positive",
            item.item
        )));
    }

    if item.rate < zero || !fits_scale(&item.rate, scale) {
        return Err(LedgerError::validation(format!(
            "Rate for '{}' must be non-negative with at most {} decimal places",
            item.item, scale
        )));
    }

    if item.tax_rate < zero || item.tax_rate > hundred {
        return Err(LedgerError::validation(format!(
            "Tax rate for '{}' must be between 0 and 100",
            item.item
        )));
    }

    let gross = round_money(&(&item.quantity * &item.rate), scale);

    if item.discount < zero || item.discount > gross || !fits_scale(&item.discount, scale) {
        return Err(LedgerError::validation(format!(
            "Discount for '{}' must be between 0 and {} with at most {} decimal places",
            item.item, gross, scale
        )));
    }

    let net = &gross - &item.discount;
    let tax = round_money(&(&net * &item.tax_rate / hundred), scale);
    let amount = &net + &tax;

    Ok(LineAmounts {
        gross,
        net,
        tax,
        amount,
    })
}

impl DocumentTotals {
    /// Compute totals for `items`, filling each item's derived `tax` and `amount`
    pub fn compute(items: &mut [LineItem], scale: i64) -> LedgerResult<Self> {
        if items.is_empty() {
            return Err(LedgerError::validation(
                "Document must have at least one line item",
            ));
        }

        let mut subtotal = BigDecimal::from(0);
        let mut discount = BigDecimal::from(0);
        let mut tax = BigDecimal::from(0);

        for item in items.iter_mut() {
            let amounts = compute_line(item, scale)?;
            subtotal += &amounts.gross;
            discount += &item.discount;
            tax += &amounts.tax;
            item.tax = amounts.tax;
            item.amount = amounts.amount;
        }

        let total = &subtotal - &discount + &tax;

        Ok(Self {
            subtotal: round_money(&subtotal, scale),
            discount: round_money(&discount, scale),
            tax: round_money(&tax, scale),
            total: round_money(&total, scale),
        })
    }
}
