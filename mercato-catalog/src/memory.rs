use async_trait::async_trait;
use chrono::Utc;
use mercato_core::{Page, PageRequest};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::product::{Product, ProductFilter};
use crate::store::{CatalogError, ProductStore};

/// In-memory product store for tests and single-node development. A single
/// mutex serializes every operation, which makes `apply_reservation` an
/// atomic check-and-decrement.
#[derive(Default)]
pub struct MemoryProductStore {
    products: Mutex<HashMap<Uuid, Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product directly, bypassing the async trait. Test helper.
    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    pub fn quantity_of(&self, id: Uuid) -> i64 {
        self.products
            .lock()
            .unwrap()
            .get(&id)
            .map(|p| p.quantity)
            .unwrap_or(0)
    }

    pub fn soft_delete(&self, id: Uuid) {
        if let Some(product) = self.products.lock().unwrap().get_mut(&id) {
            product.deleted = true;
        }
    }

    fn paged(mut items: Vec<Product>, page: PageRequest) -> Page<Product> {
        items.sort_by(|a, b| a.name.cmp(&b.name));
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Page::new(items, page, total)
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, product: &Product) -> Result<(), CatalogError> {
        self.products
            .lock()
            .unwrap()
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, product: &Product) -> Result<(), CatalogError> {
        let mut products = self.products.lock().unwrap();
        if !products.contains_key(&product.id) {
            return Err(CatalogError::NotFound(product.id));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Product>, CatalogError> {
        let items: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| !p.deleted)
            .cloned()
            .collect();
        Ok(Self::paged(items, page))
    }

    async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, CatalogError> {
        let items: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(Self::paged(items, page))
    }

    async fn apply_reservation(&self, product_id: Uuid, quantity: i64) -> Result<(), CatalogError> {
        if quantity <= 0 {
            return Err(CatalogError::InvalidQuantity { product_id, quantity });
        }
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::NotFound(product_id))?;

        if product.deleted {
            return Err(CatalogError::Unavailable(product_id));
        }
        if product.quantity < quantity {
            return Err(CatalogError::OutOfStock {
                product_id,
                requested: quantity,
                available: product.quantity,
            });
        }

        product.quantity -= quantity;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn release_reservation(
        &self,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or(CatalogError::NotFound(product_id))?;
        product.quantity += quantity;
        product.updated_at = Utc::now();
        Ok(())
    }
}
