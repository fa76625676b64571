//! Bill and bill item entities.
//!
//! A bill is an immutable record of a completed sale. Its items snapshot
//! the product name and selling price at sale time; later product edits do
//! not rewrite history. Deleting a bill deletes its items.

use chrono::NaiveDate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Human-facing bill number, unique across all bills.
    pub bill_number: String,
    /// Sum of the items' subtotals.
    pub total_amount: f64,
    /// The user who created the bill.
    pub created_by: i64,
    /// When the bill was created.
    pub created_at: DateTime<Utc>,
}

/// A line item owned by a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Owning bill.
    pub bill_id: i64,
    /// The product sold.
    pub product_id: i64,
    /// Product name at sale time.
    pub product_name: String,
    /// Units sold.
    pub quantity: i32,
    /// Selling price per unit at sale time.
    pub price_per_unit: f64,
    /// `quantity * price_per_unit`.
    pub subtotal: f64,
}

/// A bill together with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillWithItems {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

/// One requested line of a bill, resolved to a concrete product.
///
/// The store re-validates quantity against live stock inside its
/// transaction; callers pre-validate only to fail fast with a good message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillRequestLine {
    pub product_id: i64,
    pub quantity: i32,
}

/// Formats a bill number: `BILL<YYYYMMDD><seq>` with the sequence
/// zero-padded to four digits. The sequence is the day-independent count
/// of all existing bills plus one.
#[must_use]
pub fn format_bill_number(date: NaiveDate, seq: u64) -> String {
    format!("BILL{}{:04}", date.format("%Y%m%d"), seq)
}
