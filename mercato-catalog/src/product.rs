use chrono::{DateTime, Utc};
use mercato_core::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product. Quantity is only ever mutated through the inventory
/// ledger's reservation path; catalog edits replace the whole row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    /// Soft delete: deleted products stay in storage but read as absent.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            unit_price: input.unit_price,
            quantity: input.quantity,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.deleted && self.quantity > 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProduct {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
}

/// Search filter over non-deleted products. All fields are conjunctive;
/// `None` means "don't care".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the name.
    pub name: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// `Some(true)` restricts to products with stock on hand.
    pub available: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if product.deleted {
            return false;
        }
        if let Some(name) = &self.name {
            if !product.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.unit_price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.unit_price > max {
                return false;
            }
        }
        if self.available == Some(true) && product.quantity <= 0 {
            return false;
        }
        true
    }
}
