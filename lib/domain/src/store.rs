//! Store contracts implemented by the persistence layer.
//!
//! The server provides Postgres-backed implementations; [`crate::memory`]
//! provides the in-process one used by tests. Implementations own their
//! transactional guarantees: `BillStore::create` in particular must be
//! all-or-nothing and must re-validate stock against live quantities
//! inside the same unit of work that decrements them.

use crate::bill::{BillRequestLine, BillWithItems};
use crate::error::DomainError;
use crate::product::{NewProduct, Product, ProductUpdate};
use crate::report::{ProfitLossReport, SalesSummary};
use crate::user::{NewUser, User};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Lists every product, ordered by id.
    async fn list(&self) -> Result<Vec<Product>, DomainError>;

    /// Fetches a product by id.
    async fn get(&self, id: i64) -> Result<Option<Product>, DomainError>;

    /// Resolves a product by name: case-insensitive exact match first,
    /// else case-insensitive substring. Ambiguous substring matches are
    /// rejected.
    async fn resolve_by_name(&self, name: &str) -> Result<Product, DomainError>;

    /// Inserts a product. Rejects a name that already exists
    /// case-insensitively.
    async fn insert(&self, new: NewProduct) -> Result<Product, DomainError>;

    /// Applies a partial update.
    async fn update(&self, id: i64, update: ProductUpdate) -> Result<Product, DomainError>;

    /// Deletes a product by id.
    async fn delete(&self, id: i64) -> Result<(), DomainError>;

    /// Replaces a product's quantity outright.
    async fn set_quantity(&self, id: i64, quantity: i32) -> Result<Product, DomainError>;

    /// Products with quantity strictly below the threshold.
    async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, DomainError>;
}

/// Bill persistence and sales aggregation.
#[async_trait]
pub trait BillStore: Send + Sync {
    /// Creates a bill atomically: allocates the bill number, writes the
    /// bill and its items snapshotting live product name and price, and
    /// decrements stock. Either everything commits or nothing does.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product id; `InsufficientStock` when a
    /// line exceeds the live quantity at commit time.
    async fn create(
        &self,
        created_by: i64,
        lines: &[BillRequestLine],
    ) -> Result<BillWithItems, DomainError>;

    /// Fetches a bill with its items.
    async fn get(&self, id: i64) -> Result<Option<BillWithItems>, DomainError>;

    /// Lists all bills, newest first.
    async fn list(&self) -> Result<Vec<BillWithItems>, DomainError>;

    /// Lists bills created by one user, newest first.
    async fn list_by_creator(&self, user_id: i64) -> Result<Vec<BillWithItems>, DomainError>;

    /// Deletes a bill and its items.
    async fn delete(&self, id: i64) -> Result<(), DomainError>;

    /// Sales totals for one day.
    async fn daily_sales(&self, date: NaiveDate) -> Result<SalesSummary, DomainError>;

    /// Profit and loss over an inclusive date range.
    async fn profit_loss(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProfitLossReport, DomainError>;
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lists every user, ordered by id.
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Fetches a user by id.
    async fn get(&self, id: i64) -> Result<Option<User>, DomainError>;

    /// Fetches a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Inserts a user. Rejects duplicate username or email.
    async fn insert(&self, new: NewUser) -> Result<User, DomainError>;

    /// Deletes a user by id.
    async fn delete(&self, id: i64) -> Result<(), DomainError>;
}
