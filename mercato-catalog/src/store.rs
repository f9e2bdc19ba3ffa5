use async_trait::async_trait;
use mercato_core::{Page, PageRequest};
use uuid::Uuid;

use crate::product::{Product, ProductFilter};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(Uuid),

    #[error("product unavailable: {0}")]
    Unavailable(Uuid),

    #[error("out of stock for product {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: Uuid, quantity: i64 },

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Catalog persistence seam. `apply_reservation` is the one mutation the
/// inventory ledger relies on and must be an atomic conditional write at the
/// storage layer, never a read-then-write pair.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: &Product) -> Result<(), CatalogError>;

    /// Returns the row as stored, including soft-deleted products. Callers
    /// that expose products to users are responsible for hiding deleted rows.
    async fn find(&self, id: Uuid) -> Result<Option<Product>, CatalogError>;

    async fn update(&self, product: &Product) -> Result<(), CatalogError>;

    async fn list(&self, page: PageRequest) -> Result<Page<Product>, CatalogError>;

    async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, CatalogError>;

    /// Decrements available quantity by `quantity` only if the product
    /// exists, is not deleted, and has at least `quantity` on hand.
    /// Fails with `OutOfStock` (carrying current availability) otherwise.
    /// `quantity` must be positive; a non-positive value is rejected with
    /// `InvalidQuantity` before any row is touched.
    async fn apply_reservation(&self, product_id: Uuid, quantity: i64) -> Result<(), CatalogError>;

    /// Compensating add-back for a previously applied reservation.
    async fn release_reservation(
        &self,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<(), CatalogError>;
}
