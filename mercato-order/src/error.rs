use mercato_catalog::CatalogError;
use uuid::Uuid;

/// Placement and read errors. Catalog failures (missing product, soft-deleted
/// product, insufficient stock) pass through unchanged so callers keep the
/// quantities needed for display.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Also returned, instead of a permission error, when a non-owner,
    /// non-admin principal asks for someone else's order.
    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("permission denied")]
    Forbidden,

    #[error("invalid order request: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("storage failure: {0}")]
    Storage(String),
}
