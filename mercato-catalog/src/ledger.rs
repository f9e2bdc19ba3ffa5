use mercato_core::Money;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::store::{CatalogError, ProductStore};

/// One requested order line: product and positive quantity.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// A committed reservation line carrying the product snapshot taken at
/// validation time. Name and price on the order never change after this.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl ReservedLine {
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// All-or-nothing inventory reservation over the product store.
///
/// `reserve` runs a validation pass over every line before touching any
/// quantity, then commits line by line with the store's atomic conditional
/// decrement. A commit-pass failure (a concurrent reservation winning the
/// race between validation and commit) rolls back the lines already
/// committed, so a failed call leaves every product untouched.
pub struct InventoryLedger {
    store: Arc<dyn ProductStore>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn reserve(&self, lines: &[LineRequest]) -> Result<Vec<ReservedLine>, CatalogError> {
        // Validation pass: no mutation until every line checks out.
        let mut reserved = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(CatalogError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }

            let product = self
                .store
                .find(line.product_id)
                .await?
                .ok_or(CatalogError::NotFound(line.product_id))?;

            if product.deleted {
                return Err(CatalogError::Unavailable(line.product_id));
            }
            if product.quantity < line.quantity {
                return Err(CatalogError::OutOfStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.quantity,
                });
            }

            reserved.push(ReservedLine {
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: product.unit_price,
            });
        }

        // Commit pass: conditional decrements, with rollback of earlier
        // lines if a concurrent reservation consumed the stock in between.
        for (committed, line) in lines.iter().enumerate() {
            if let Err(err) = self
                .store
                .apply_reservation(line.product_id, line.quantity)
                .await
            {
                warn!(
                    product_id = %line.product_id,
                    "reservation commit failed, rolling back {} committed line(s)",
                    committed
                );
                self.release(&lines[..committed]).await;
                return Err(err);
            }
        }

        Ok(reserved)
    }

    /// Compensating release of previously reserved quantities. Best effort:
    /// a release failure is logged and skipped so the remaining lines still
    /// get their stock back.
    pub async fn release(&self, lines: &[LineRequest]) {
        for line in lines {
            if let Err(err) = self
                .store
                .release_reservation(line.product_id, line.quantity)
                .await
            {
                warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    "failed to release reservation: {err}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProductStore;
    use crate::product::CreateProduct;
    use crate::product::Product;

    fn seeded_store(products: &[(&str, i64, i64)]) -> (Arc<MemoryProductStore>, Vec<Uuid>) {
        let store = Arc::new(MemoryProductStore::new());
        let mut ids = Vec::new();
        for (name, price, quantity) in products {
            let product = Product::new(CreateProduct {
                name: name.to_string(),
                description: None,
                unit_price: Money::from_minor(*price),
                quantity: *quantity,
            });
            ids.push(product.id);
            store.insert(product);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn reserve_decrements_every_line() {
        let (store, ids) = seeded_store(&[("a", 100, 10), ("b", 200, 5)]);
        let ledger = InventoryLedger::new(store.clone());

        let reserved = ledger
            .reserve(&[
                LineRequest { product_id: ids[0], quantity: 3 },
                LineRequest { product_id: ids[1], quantity: 5 },
            ])
            .await
            .unwrap();

        assert_eq!(reserved.len(), 2);
        assert_eq!(reserved[0].line_subtotal(), Money::from_minor(300));
        assert_eq!(store.quantity_of(ids[0]), 7);
        assert_eq!(store.quantity_of(ids[1]), 0);
    }

    #[tokio::test]
    async fn failed_validation_changes_nothing() {
        let (store, ids) = seeded_store(&[("a", 100, 10), ("b", 200, 2)]);
        let ledger = InventoryLedger::new(store.clone());

        let err = ledger
            .reserve(&[
                LineRequest { product_id: ids[0], quantity: 3 },
                LineRequest { product_id: ids[1], quantity: 4 },
            ])
            .await
            .unwrap_err();

        match err {
            CatalogError::OutOfStock { requested, available, .. } => {
                assert_eq!(requested, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }
        assert_eq!(store.quantity_of(ids[0]), 10);
        assert_eq!(store.quantity_of(ids[1]), 2);
    }

    #[tokio::test]
    async fn commit_pass_failure_releases_committed_lines() {
        // Two lines for the same product that each pass validation alone
        // but cannot both be committed.
        let (store, ids) = seeded_store(&[("a", 100, 5)]);
        let ledger = InventoryLedger::new(store.clone());

        let err = ledger
            .reserve(&[
                LineRequest { product_id: ids[0], quantity: 3 },
                LineRequest { product_id: ids[0], quantity: 3 },
            ])
            .await
            .unwrap_err();

        match err {
            CatalogError::OutOfStock { requested, available, .. } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }
        assert_eq!(store.quantity_of(ids[0]), 5);
    }

    #[tokio::test]
    async fn non_positive_quantities_are_rejected() {
        let (store, ids) = seeded_store(&[("a", 100, 10)]);
        let ledger = InventoryLedger::new(store.clone());

        for quantity in [0, -4] {
            let err = ledger
                .reserve(&[LineRequest { product_id: ids[0], quantity }])
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::InvalidQuantity { .. }));
        }
        assert_eq!(store.quantity_of(ids[0]), 10);

        // The store guards itself too: a direct negative decrement must not
        // add stock back.
        let err = store.apply_reservation(ids[0], -2).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQuantity { .. }));
        assert_eq!(store.quantity_of(ids[0]), 10);
    }

    #[tokio::test]
    async fn unknown_and_deleted_products_fail_the_whole_call() {
        let (store, ids) = seeded_store(&[("a", 100, 10)]);
        let ledger = InventoryLedger::new(store.clone());

        let missing = Uuid::new_v4();
        let err = ledger
            .reserve(&[LineRequest { product_id: missing, quantity: 1 }])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == missing));

        store.soft_delete(ids[0]);
        let err = ledger
            .reserve(&[LineRequest { product_id: ids[0], quantity: 1 }])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(id) if id == ids[0]));
    }

    #[tokio::test]
    async fn release_restores_quantities() {
        let (store, ids) = seeded_store(&[("a", 100, 10)]);
        let ledger = InventoryLedger::new(store.clone());

        let lines = [LineRequest { product_id: ids[0], quantity: 6 }];
        ledger.reserve(&lines).await.unwrap();
        assert_eq!(store.quantity_of(ids[0]), 4);

        ledger.release(&lines).await;
        assert_eq!(store.quantity_of(ids[0]), 10);
    }
}
