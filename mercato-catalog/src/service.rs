use mercato_core::{Cache, Page, PageRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::product::{CreateProduct, Product, ProductFilter, UpdateProduct};
use crate::store::{CatalogError, ProductStore};

const PRODUCT_CACHE: &str = "products";

/// Catalog reads and administrative edits. Stock quantities are owned by the
/// inventory ledger; this service treats the quantity field as a plain
/// attribute when creating or correcting products.
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn Cache>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    pub async fn create_product(&self, input: CreateProduct) -> Result<Product, CatalogError> {
        let product = Product::new(input);
        self.store.create(&product).await?;
        self.evict_products().await;
        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Soft-deleted products read as absent.
    pub async fn get_product(&self, id: Uuid) -> Result<Product, CatalogError> {
        if let Some(cached) = self.cached_product(id).await {
            return Ok(cached);
        }

        debug!(product_id = %id, "fetching product");
        let product = self
            .store
            .find(id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or(CatalogError::NotFound(id))?;

        self.cache_product(&product).await;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> Result<Product, CatalogError> {
        let mut product = self
            .store
            .find(id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or(CatalogError::NotFound(id))?;

        product.name = input.name;
        product.description = input.description;
        product.unit_price = input.unit_price;
        product.quantity = input.quantity;
        product.updated_at = chrono::Utc::now();

        self.store.update(&product).await?;
        self.evict_products().await;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Soft delete: the row stays so existing order lines keep a valid
    /// reference, but the product stops being sellable or visible.
    pub async fn delete_product(&self, id: Uuid) -> Result<(), CatalogError> {
        let mut product = self
            .store
            .find(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        product.deleted = true;
        product.updated_at = chrono::Utc::now();
        self.store.update(&product).await?;
        self.evict_products().await;
        info!(product_id = %id, "product soft deleted");
        Ok(())
    }

    pub async fn list_products(&self, page: PageRequest) -> Result<Page<Product>, CatalogError> {
        debug!(page = page.page, size = page.size, "listing products");
        self.store.list(page).await
    }

    pub async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, CatalogError> {
        debug!(?filter, "searching products");
        self.store.search(filter, page).await
    }

    async fn cached_product(&self, id: Uuid) -> Option<Product> {
        match self.cache.get(PRODUCT_CACHE, &id.to_string()).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!("product cache read failed: {err}");
                None
            }
        }
    }

    async fn cache_product(&self, product: &Product) {
        match serde_json::to_value(product) {
            Ok(value) => {
                if let Err(err) = self
                    .cache
                    .put(PRODUCT_CACHE, &product.id.to_string(), value)
                    .await
                {
                    warn!("product cache write failed: {err}");
                }
            }
            Err(err) => warn!("product cache serialization failed: {err}"),
        }
    }

    async fn evict_products(&self) {
        if let Err(err) = self.cache.evict_all(PRODUCT_CACHE).await {
            warn!("product cache eviction failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProductStore;
    use mercato_core::{MemoryCache, Money};

    fn service() -> CatalogService {
        CatalogService::new(
            Arc::new(MemoryProductStore::new()),
            Arc::new(MemoryCache::new()),
        )
    }

    fn create(name: &str, quantity: i64) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            description: Some("test product".to_string()),
            unit_price: Money::from_minor(2500),
            quantity,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let svc = service();
        let created = svc.create_product(create("widget", 4)).await.unwrap();
        let fetched = svc.get_product(created.id).await.unwrap();
        assert_eq!(fetched.name, "widget");
        assert_eq!(fetched.quantity, 4);
    }

    #[tokio::test]
    async fn deleted_products_read_as_not_found() {
        let svc = service();
        let created = svc.create_product(create("widget", 4)).await.unwrap();
        svc.delete_product(created.id).await.unwrap();

        let err = svc.get_product(created.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == created.id));
    }

    #[tokio::test]
    async fn update_replaces_attributes() {
        let svc = service();
        let created = svc.create_product(create("widget", 4)).await.unwrap();

        let updated = svc
            .update_product(
                created.id,
                UpdateProduct {
                    name: "gadget".to_string(),
                    description: None,
                    unit_price: Money::from_minor(3000),
                    quantity: 9,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "gadget");
        assert_eq!(updated.unit_price, Money::from_minor(3000));
        assert_eq!(updated.quantity, 9);
    }

    #[tokio::test]
    async fn search_filters_by_availability() {
        let svc = service();
        svc.create_product(create("in stock", 2)).await.unwrap();
        svc.create_product(create("sold out", 0)).await.unwrap();

        let filter = ProductFilter {
            available: Some(true),
            ..Default::default()
        };
        let page = svc
            .search_products(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "in stock");
    }
}
