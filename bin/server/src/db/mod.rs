//! Postgres store implementations.
//!
//! Each store follows the same shape: a `FromRow` row struct mirroring
//! the table, converted into the domain type, with runtime-bound
//! `query_as` queries. Transactional guarantees live here; the domain
//! traits only describe them.

pub mod bill;
pub mod product;
pub mod user;

pub use bill::PgBillStore;
pub use product::PgProductStore;
pub use user::PgUserStore;

use storefront_domain::DomainError;

/// Maps an infrastructure failure into the domain taxonomy.
pub(crate) fn storage_error(error: sqlx::Error) -> DomainError {
    DomainError::storage(error.to_string())
}

/// Returns true if the error is a unique-constraint violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// The violated constraint's name, when the database reports one.
pub(crate) fn violated_constraint(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}
