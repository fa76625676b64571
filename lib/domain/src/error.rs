//! Error types for domain operations.
//!
//! Every domain operation reports failure through [`DomainError`] rather
//! than unwinding. The dispatcher folds these into the tool result
//! envelope; the HTTP layer maps them to status codes.

use std::fmt;

/// Errors from domain operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// An argument failed validation.
    Validation { field: String, reason: String },
    /// A referenced entity does not exist.
    NotFound { entity: &'static str, key: String },
    /// A fuzzy product lookup matched more than one row.
    AmbiguousProduct {
        name: String,
        candidates: Vec<String>,
    },
    /// Requested quantity exceeds available stock.
    InsufficientStock {
        product: String,
        requested: i32,
        available: i32,
    },
    /// A uniqueness constraint would be violated.
    Duplicate { entity: &'static str, value: String },
    /// A user attempted to delete their own account.
    SelfDeletion,
    /// The backing store failed.
    Storage { reason: String },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, reason } => {
                write!(f, "invalid value for '{field}': {reason}")
            }
            Self::NotFound { entity, key } => {
                write!(f, "{entity} '{key}' not found")
            }
            Self::AmbiguousProduct { name, candidates } => {
                write!(
                    f,
                    "product name '{name}' is ambiguous, matches: {}",
                    candidates.join(", ")
                )
            }
            Self::InsufficientStock {
                product,
                requested: _,
                available,
            } => {
                write!(f, "Insufficient stock for {product}. Available: {available}")
            }
            Self::Duplicate { entity, value } => {
                write!(f, "{entity} '{value}' already exists")
            }
            Self::SelfDeletion => write!(f, "You cannot delete your own account"),
            Self::Storage { reason } => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for DomainError {}

impl DomainError {
    /// Shorthand for a validation failure.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a storage failure.
    #[must_use]
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = DomainError::NotFound {
            entity: "Product",
            key: "Widget".to_string(),
        };
        assert_eq!(err.to_string(), "Product 'Widget' not found");
    }

    #[test]
    fn insufficient_stock_display_names_availability() {
        let err = DomainError::InsufficientStock {
            product: "Widget".to_string(),
            requested: 6,
            available: 2,
        };
        assert!(err.to_string().contains("Widget"));
        assert!(err.to_string().contains("Available: 2"));
    }

    #[test]
    fn ambiguous_product_lists_candidates() {
        let err = DomainError::AmbiguousProduct {
            name: "cola".to_string(),
            candidates: vec!["Cola Can".to_string(), "Cola Bottle".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("Cola Can"));
        assert!(text.contains("Cola Bottle"));
    }

    #[test]
    fn duplicate_display() {
        let err = DomainError::Duplicate {
            entity: "Username",
            value: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "Username 'alice' already exists");
    }
}
