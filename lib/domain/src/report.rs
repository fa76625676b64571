//! Reporting aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One bill row in a daily sales report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSummary {
    pub bill_number: String,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    /// Full name of the creating user.
    pub created_by: String,
}

/// Sales totals for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub date: NaiveDate,
    pub total_bills: i64,
    pub total_sales: f64,
    pub bills: Vec<BillSummary>,
}

/// Profit and loss over an inclusive date range.
///
/// Cost joins each sold item against its product's purchase price at read
/// time, not at sale time; items whose product was deleted contribute no
/// cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLossReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_bills: i64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub profit: f64,
    /// `profit / revenue * 100`, or 0 when revenue is 0.
    pub profit_margin: f64,
}

impl ProfitLossReport {
    /// Builds a report from raw totals, deriving profit and margin.
    #[must_use]
    pub fn from_totals(
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_bills: i64,
        total_revenue: f64,
        total_cost: f64,
    ) -> Self {
        let profit = total_revenue - total_cost;
        let profit_margin = if total_revenue > 0.0 {
            profit / total_revenue * 100.0
        } else {
            0.0
        };
        Self {
            start_date,
            end_date,
            total_bills,
            total_revenue,
            total_cost,
            profit,
            profit_margin,
        }
    }
}
