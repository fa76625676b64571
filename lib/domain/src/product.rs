//! Product entity and name resolution.

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product in the store inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Product name. Not unique; duplicates are rejected case-insensitively
    /// on insert but may exist in imported data.
    pub name: String,
    /// Units in stock. Never negative.
    pub quantity: i32,
    /// Cost price per unit.
    pub purchase_price: f64,
    /// Selling price per unit.
    pub selling_price: f64,
    /// Optional category label.
    pub category: Option<String>,
    /// Optional supplier label.
    pub supplier: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i32,
    pub purchase_price: f64,
    pub selling_price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
}

impl NewProduct {
    /// Validates field constraints before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity", "must not be negative"));
        }
        if self.purchase_price < 0.0 {
            return Err(DomainError::validation(
                "purchase_price",
                "must not be negative",
            ));
        }
        if self.selling_price < 0.0 {
            return Err(DomainError::validation(
                "selling_price",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Partial update for a product. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub purchase_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub category: Option<String>,
    pub supplier: Option<String>,
}

/// Resolves a product reference by name against a product slice.
///
/// Resolution is case-insensitive: an exact match wins outright (lowest id
/// when duplicate names exist), otherwise a substring match is attempted.
/// A substring that matches more than one product is rejected rather than
/// silently picking a row.
///
/// # Errors
///
/// `NotFound` when nothing matches; `AmbiguousProduct` when the substring
/// fallback matches several products.
pub fn resolve_by_name<'a>(
    products: &'a [Product],
    name: &str,
) -> Result<&'a Product, DomainError> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return Err(DomainError::validation("product_name", "must not be empty"));
    }

    if let Some(exact) = products
        .iter()
        .filter(|p| p.name.to_lowercase() == needle)
        .min_by_key(|p| p.id)
    {
        return Ok(exact);
    }

    let mut partial: Vec<&Product> = products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect();
    partial.sort_by_key(|p| p.id);

    match partial.as_slice() {
        [] => Err(DomainError::NotFound {
            entity: "Product",
            key: name.trim().to_string(),
        }),
        [single] => Ok(single),
        many => Err(DomainError::AmbiguousProduct {
            name: name.trim().to_string(),
            candidates: many.iter().map(|p| p.name.clone()).collect(),
        }),
    }
}
