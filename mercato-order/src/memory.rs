use async_trait::async_trait;
use mercato_core::{Page, PageRequest};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::Order;
use crate::store::OrderStore;

/// In-memory order store for tests and single-node development.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn paged(mut items: Vec<Order>, page: PageRequest) -> Page<Order> {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
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
impl OrderStore for MemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        self.orders.lock().unwrap().insert(order.id, order.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        let items: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(Self::paged(items, page))
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, OrderError> {
        let items: Vec<Order> = self.orders.lock().unwrap().values().cloned().collect();
        Ok(Self::paged(items, page))
    }
}
