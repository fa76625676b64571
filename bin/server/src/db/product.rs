//! Product repository.

use crate::db::{is_unique_violation, storage_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use storefront_domain::{DomainError, NewProduct, Product, ProductStore, ProductUpdate};

/// Row type for product queries.
#[derive(FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    quantity: i32,
    purchase_price: f64,
    selling_price: f64,
    category: Option<String>,
    supplier: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            quantity: self.quantity,
            purchase_price: self.purchase_price,
            selling_price: self.selling_price,
            category: self.category,
            supplier: self.supplier,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Escapes LIKE wildcards in user-supplied match text.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Postgres-backed [`ProductStore`].
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, DomainError> {
        let rows: Vec<ProductRow> = sqlx::query_as("SELECT * FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(ProductRow::into_product))
    }

    async fn resolve_by_name(&self, name: &str) -> Result<Product, DomainError> {
        let needle = name.trim();
        if needle.is_empty() {
            return Err(DomainError::validation("product_name", "must not be empty"));
        }

        let exact: Option<ProductRow> = sqlx::query_as(
            "SELECT * FROM products WHERE lower(name) = lower($1) ORDER BY id LIMIT 1",
        )
        .bind(needle)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        if let Some(row) = exact {
            return Ok(row.into_product());
        }

        let mut partial: Vec<ProductRow> = sqlx::query_as(
            "SELECT * FROM products WHERE name ILIKE '%' || $1 || '%' ORDER BY id LIMIT 10",
        )
        .bind(escape_like(needle))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        match partial.len() {
            0 => Err(DomainError::NotFound {
                entity: "Product",
                key: needle.to_string(),
            }),
            1 => Ok(partial.swap_remove(0).into_product()),
            _ => Err(DomainError::AmbiguousProduct {
                name: needle.to_string(),
                candidates: partial.into_iter().map(|p| p.name).collect(),
            }),
        }
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, DomainError> {
        new.validate()?;
        let row: ProductRow = sqlx::query_as(
            r#"
            INSERT INTO products (name, quantity, purchase_price, selling_price, category, supplier)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(new.quantity)
        .bind(new.purchase_price)
        .bind(new.selling_price)
        .bind(&new.category)
        .bind(&new.supplier)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::Duplicate {
                    entity: "Product",
                    value: new.name.clone(),
                }
            } else {
                storage_error(e)
            }
        })?;
        Ok(row.into_product())
    }

    async fn update(&self, id: i64, update: ProductUpdate) -> Result<Product, DomainError> {
        if let Some(quantity) = update.quantity {
            if quantity < 0 {
                return Err(DomainError::validation("quantity", "must not be negative"));
            }
        }

        let current = self.get(id).await?.ok_or(DomainError::NotFound {
            entity: "Product",
            key: id.to_string(),
        })?;

        let row: ProductRow = sqlx::query_as(
            r#"
            UPDATE products
            SET name = $2,
                quantity = $3,
                purchase_price = $4,
                selling_price = $5,
                category = $6,
                supplier = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name.unwrap_or(current.name))
        .bind(update.quantity.unwrap_or(current.quantity))
        .bind(update.purchase_price.unwrap_or(current.purchase_price))
        .bind(update.selling_price.unwrap_or(current.selling_price))
        .bind(update.category.or(current.category))
        .bind(update.supplier.or(current.supplier))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.into_product())
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let deleted: Option<(i64,)> =
            sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        deleted.map(|_| ()).ok_or(DomainError::NotFound {
            entity: "Product",
            key: id.to_string(),
        })
    }

    async fn set_quantity(&self, id: i64, quantity: i32) -> Result<Product, DomainError> {
        if quantity < 0 {
            return Err(DomainError::validation(
                "new_quantity",
                "must not be negative",
            ));
        }
        let row: Option<ProductRow> = sqlx::query_as(
            "UPDATE products SET quantity = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(ProductRow::into_product).ok_or(DomainError::NotFound {
            entity: "Product",
            key: id.to_string(),
        })
    }

    async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as("SELECT * FROM products WHERE quantity < $1 ORDER BY id")
                .bind(threshold)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?;
        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }
}
