//! Bill repository.
//!
//! Bill creation is the one genuinely concurrent mutation in the system:
//! the conditional stock decrement takes the product row locks, so two
//! bills racing over the same product serialize, and the guarded
//! `quantity >= $n` predicate re-validates against live stock inside the
//! transaction. The bill number is counted inside the same transaction
//! and protected by the unique constraint; a collision rolls the whole
//! transaction back and retries.

use crate::db::{is_unique_violation, storage_error};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use storefront_domain::{
    Bill, BillItem, BillRequestLine, BillStore, BillSummary, BillWithItems, DomainError,
    ProfitLossReport, SalesSummary, format_bill_number,
};

/// Attempts before giving up on a unique bill number.
const BILL_NUMBER_ATTEMPTS: u32 = 3;

/// Row type for bill queries.
#[derive(FromRow)]
struct BillRow {
    id: i64,
    bill_number: String,
    total_amount: f64,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl BillRow {
    fn into_bill(self) -> Bill {
        Bill {
            id: self.id,
            bill_number: self.bill_number,
            total_amount: self.total_amount,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Row type for bill item queries.
#[derive(FromRow)]
struct BillItemRow {
    id: i64,
    bill_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i32,
    price_per_unit: f64,
    subtotal: f64,
}

impl BillItemRow {
    fn into_item(self) -> BillItem {
        BillItem {
            id: self.id,
            bill_id: self.bill_id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            subtotal: self.subtotal,
        }
    }
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Postgres-backed [`BillStore`].
pub struct PgBillStore {
    pool: PgPool,
}

impl PgBillStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One creation attempt. `Ok(None)` signals a bill-number collision;
    /// the dropped transaction has already rolled everything back.
    async fn try_create(
        &self,
        created_by: i64,
        lines: &[BillRequestLine],
    ) -> Result<Option<BillWithItems>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let mut priced_lines = Vec::with_capacity(lines.len());
        let mut total_amount = 0.0;
        for line in lines {
            let updated: Option<(String, f64)> = sqlx::query_as(
                r#"
                UPDATE products
                SET quantity = quantity - $2, updated_at = now()
                WHERE id = $1 AND quantity >= $2
                RETURNING name, selling_price
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_error)?;

            let Some((name, price)) = updated else {
                let existing: Option<(String, i32)> =
                    sqlx::query_as("SELECT name, quantity FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(storage_error)?;
                return Err(match existing {
                    None => DomainError::NotFound {
                        entity: "Product",
                        key: line.product_id.to_string(),
                    },
                    Some((name, available)) => DomainError::InsufficientStock {
                        product: name,
                        requested: line.quantity,
                        available,
                    },
                });
            };

            let subtotal = price * f64::from(line.quantity);
            total_amount += subtotal;
            priced_lines.push((line.product_id, name, line.quantity, price, subtotal));
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bills")
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
        let bill_number = format_bill_number(Utc::now().date_naive(), count as u64 + 1);

        let inserted: Result<BillRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO bills (bill_number, total_amount, created_by)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&bill_number)
        .bind(total_amount)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await;
        let bill_row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(bill_number, "bill number collided, retrying");
                return Ok(None);
            }
            Err(e) => return Err(storage_error(e)),
        };

        let mut items = Vec::with_capacity(priced_lines.len());
        for (product_id, product_name, quantity, price_per_unit, subtotal) in priced_lines {
            let item: BillItemRow = sqlx::query_as(
                r#"
                INSERT INTO bill_items
                    (bill_id, product_id, product_name, quantity, price_per_unit, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(bill_row.id)
            .bind(product_id)
            .bind(&product_name)
            .bind(quantity)
            .bind(price_per_unit)
            .bind(subtotal)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
            items.push(item.into_item());
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(Some(BillWithItems {
            bill: bill_row.into_bill(),
            items,
        }))
    }

    async fn attach_items(
        &self,
        bills: Vec<BillRow>,
    ) -> Result<Vec<BillWithItems>, DomainError> {
        let ids: Vec<i64> = bills.iter().map(|b| b.id).collect();
        let rows: Vec<BillItemRow> =
            sqlx::query_as("SELECT * FROM bill_items WHERE bill_id = ANY($1) ORDER BY id")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?;

        let mut by_bill: HashMap<i64, Vec<BillItem>> = HashMap::new();
        for row in rows {
            by_bill.entry(row.bill_id).or_default().push(row.into_item());
        }

        Ok(bills
            .into_iter()
            .map(|row| {
                let items = by_bill.remove(&row.id).unwrap_or_default();
                BillWithItems {
                    bill: row.into_bill(),
                    items,
                }
            })
            .collect())
    }
}

#[async_trait]
impl BillStore for PgBillStore {
    async fn create(
        &self,
        created_by: i64,
        lines: &[BillRequestLine],
    ) -> Result<BillWithItems, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("items", "must not be empty"));
        }
        for line in lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity", "must be positive"));
            }
        }

        for _ in 0..BILL_NUMBER_ATTEMPTS {
            if let Some(bill) = self.try_create(created_by, lines).await? {
                return Ok(bill);
            }
        }
        Err(DomainError::storage(
            "could not allocate a unique bill number",
        ))
    }

    async fn get(&self, id: i64) -> Result<Option<BillWithItems>, DomainError> {
        let row: Option<BillRow> = sqlx::query_as("SELECT * FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<BillWithItems>, DomainError> {
        let rows: Vec<BillRow> =
            sqlx::query_as("SELECT * FROM bills ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?;
        self.attach_items(rows).await
    }

    async fn list_by_creator(&self, user_id: i64) -> Result<Vec<BillWithItems>, DomainError> {
        let rows: Vec<BillRow> = sqlx::query_as(
            "SELECT * FROM bills WHERE created_by = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        self.attach_items(rows).await
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let deleted: Option<(i64,)> =
            sqlx::query_as("DELETE FROM bills WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        deleted.map(|_| ()).ok_or(DomainError::NotFound {
            entity: "Bill",
            key: id.to_string(),
        })
    }

    async fn daily_sales(&self, date: NaiveDate) -> Result<SalesSummary, DomainError> {
        let (start, end) = day_bounds(date);

        #[derive(FromRow)]
        struct SalesRow {
            bill_number: String,
            total_amount: f64,
            created_at: DateTime<Utc>,
            created_by: String,
        }

        let rows: Vec<SalesRow> = sqlx::query_as(
            r#"
            SELECT b.bill_number, b.total_amount, b.created_at,
                   COALESCE(u.full_name, 'unknown') AS created_by
            FROM bills b
            LEFT JOIN users u ON u.id = b.created_by
            WHERE b.created_at >= $1 AND b.created_at < $2
            ORDER BY b.created_at
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let total_sales = rows.iter().map(|r| r.total_amount).sum();
        Ok(SalesSummary {
            date,
            total_bills: rows.len() as i64,
            total_sales,
            bills: rows
                .into_iter()
                .map(|r| BillSummary {
                    bill_number: r.bill_number,
                    total_amount: r.total_amount,
                    created_at: r.created_at,
                    created_by: r.created_by,
                })
                .collect(),
        })
    }

    async fn profit_loss(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProfitLossReport, DomainError> {
        let (range_start, _) = day_bounds(start);
        let (_, range_end) = day_bounds(end);

        let (total_bills, total_revenue): (i64, f64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
            FROM bills
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(range_start)
        .bind(range_end)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        // Cost joins against the live purchase price; items whose product
        // was deleted drop out of the join and cost nothing.
        let (total_cost,): (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(bi.quantity * p.purchase_price), 0)
            FROM bill_items bi
            JOIN bills b ON b.id = bi.bill_id
            JOIN products p ON p.id = bi.product_id
            WHERE b.created_at >= $1 AND b.created_at < $2
            "#,
        )
        .bind(range_start)
        .bind(range_end)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(ProfitLossReport::from_totals(
            start,
            end,
            total_bills,
            total_revenue,
            total_cost,
        ))
    }
}
