use async_trait::async_trait;
use mercato_core::{Page, PageRequest};
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::Order;

/// Order persistence seam. Listings are newest-first.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    async fn find(&self, id: Uuid) -> Result<Option<Order>, OrderError>;

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError>;

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, OrderError>;
}
