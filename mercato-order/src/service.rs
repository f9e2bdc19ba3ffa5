use mercato_catalog::{InventoryLedger, LineRequest};
use mercato_core::{Cache, Money, Page, PageRequest, Principal};
use mercato_pricing::{DiscountEngine, PricingContext};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocator;
use crate::error::OrderError;
use crate::models::Order;
use crate::store::OrderStore;

const ORDER_CACHE: &str = "orders";
const PRODUCT_CACHE: &str = "products";

/// The order workflow: reserve stock, compute the discount, finalize and
/// persist. The caller's identity arrives as an explicit `Principal` on
/// every operation; nothing here consults ambient state.
pub struct OrderService {
    ledger: InventoryLedger,
    engine: DiscountEngine,
    orders: Arc<dyn OrderStore>,
    cache: Arc<dyn Cache>,
}

impl OrderService {
    pub fn new(
        ledger: InventoryLedger,
        engine: DiscountEngine,
        orders: Arc<dyn OrderStore>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            ledger,
            engine,
            orders,
            cache,
        }
    }

    /// Places an order as one all-or-nothing unit: a reservation failure
    /// computes no discount and persists nothing, and a persistence failure
    /// releases the reserved quantities before the error propagates.
    pub async fn place_order(
        &self,
        principal: &Principal,
        lines: Vec<LineRequest>,
        coupon_code: Option<String>,
    ) -> Result<Order, OrderError> {
        validate_request(&lines)?;
        info!(owner = %principal.user_id, lines = lines.len(), "placing order");

        let reserved = self.ledger.reserve(&lines).await?;

        let subtotal: Money = reserved.iter().map(|l| l.line_subtotal()).sum();
        let context = PricingContext::new(subtotal, coupon_code.clone(), principal.tier);
        let discount = self.engine.compute(&context);
        debug!(%subtotal, %discount, "order priced");

        let order = allocator::finalize(principal, reserved, subtotal, discount, coupon_code);

        if let Err(err) = self.orders.save(&order).await {
            warn!(order_id = %order.id, "persisting order failed, releasing reservation");
            self.ledger.release(&lines).await;
            return Err(err);
        }

        self.evict(ORDER_CACHE).await;
        self.evict(PRODUCT_CACHE).await;
        info!(order_id = %order.id, grand_total = %order.grand_total, "order placed");
        Ok(order)
    }

    /// Owner or admin only. Anyone else gets `NotFound`, the same answer as
    /// for an order that does not exist.
    pub async fn get_order(&self, principal: &Principal, id: Uuid) -> Result<Order, OrderError> {
        let order = match self.cached_order(id).await {
            Some(order) => order,
            None => {
                debug!(order_id = %id, "fetching order");
                let order = self
                    .orders
                    .find(id)
                    .await?
                    .ok_or(OrderError::NotFound(id))?;
                self.cache_order(&order).await;
                order
            }
        };

        if order.owner_id != principal.user_id && !principal.is_admin() {
            return Err(OrderError::NotFound(id));
        }
        Ok(order)
    }

    /// The principal's own orders, newest first.
    pub async fn list_orders(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        debug!(owner = %principal.user_id, "listing orders");
        self.orders.find_by_owner(principal.user_id, page).await
    }

    /// Administrative listing across all owners.
    pub async fn list_all_orders(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        if !principal.is_admin() {
            return Err(OrderError::Forbidden);
        }
        debug!("listing all orders");
        self.orders.find_all(page).await
    }

    async fn cached_order(&self, id: Uuid) -> Option<Order> {
        match self.cache.get(ORDER_CACHE, &id.to_string()).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!("order cache read failed: {err}");
                None
            }
        }
    }

    async fn cache_order(&self, order: &Order) {
        match serde_json::to_value(order) {
            Ok(value) => {
                if let Err(err) = self.cache.put(ORDER_CACHE, &order.id.to_string(), value).await
                {
                    warn!("order cache write failed: {err}");
                }
            }
            Err(err) => warn!("order cache serialization failed: {err}"),
        }
    }

    async fn evict(&self, namespace: &str) {
        if let Err(err) = self.cache.evict_all(namespace).await {
            warn!(namespace, "cache eviction failed: {err}");
        }
    }
}

/// Structural validation, done before any inventory or discount work.
fn validate_request(lines: &[LineRequest]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::Validation(
            "order must contain at least one line".to_string(),
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(OrderError::Validation(format!(
                "quantity must be positive for product {}",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOrderStore;
    use mercato_catalog::{CreateProduct, MemoryProductStore, Product};
    use mercato_core::{CustomerTier, MemoryCache};

    fn service_with(products: &[(&str, i64, i64)]) -> (OrderService, Vec<Uuid>) {
        let product_store = Arc::new(MemoryProductStore::new());
        let mut ids = Vec::new();
        for (name, price, quantity) in products {
            let product = Product::new(CreateProduct {
                name: name.to_string(),
                description: None,
                unit_price: Money::from_minor(*price),
                quantity: *quantity,
            });
            ids.push(product.id);
            product_store.insert(product);
        }
        let service = OrderService::new(
            InventoryLedger::new(product_store),
            DiscountEngine::with_default_rules(),
            Arc::new(MemoryOrderStore::new()),
            Arc::new(MemoryCache::new()),
        );
        (service, ids)
    }

    fn standard() -> Principal {
        Principal::new(Uuid::new_v4(), "bob", CustomerTier::Standard)
    }

    #[tokio::test]
    async fn empty_request_is_rejected_before_inventory_work() {
        let (service, _) = service_with(&[("a", 100, 5)]);
        let err = service
            .place_order(&standard(), Vec::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let (service, ids) = service_with(&[("a", 100, 5)]);
        let err = service
            .place_order(
                &standard(),
                vec![LineRequest { product_id: ids[0], quantity: 0 }],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn placed_order_is_pending_with_reconciled_totals() {
        let (service, ids) = service_with(&[("a", 30_000, 10), ("b", 15_000, 10)]);
        let order = service
            .place_order(
                &standard(),
                vec![
                    LineRequest { product_id: ids[0], quantity: 1 },
                    LineRequest { product_id: ids[1], quantity: 2 },
                ],
                None,
            )
            .await
            .unwrap();

        // 300 + 300 = 600 standard -> 5% threshold discount.
        assert_eq!(order.subtotal, Money::from_major(600));
        assert_eq!(order.discount, Money::from_major(30));
        assert_eq!(order.grand_total, Money::from_major(570));
        assert_eq!(order.status, crate::models::OrderStatus::Pending);
    }
}
