use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_catalog::{CatalogError, Product, ProductFilter, ProductStore};
use mercato_core::{Money, Page, PageRequest};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

const RESERVE_ATTEMPTS: u32 = 3;

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    unit_price: i64,
    quantity: i64,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            unit_price: Money::from_minor(row.unit_price),
            quantity: row.quantity,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn storage_err(e: sqlx::Error) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

// SQLSTATE 40001: concurrent UPDATEs lost the race and should be replayed.
fn is_serialization_failure(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("40001")
    )
}

impl PgProductStore {
    /// One conditional decrement attempt. `Ok(true)` means the row changed.
    async fn try_decrement(&self, product_id: Uuid, quantity: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE AND quantity >= $2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The conditional write touched nothing; read the row once to say why.
    async fn classify_rejection(
        &self,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<CatalogError, sqlx::Error> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            None => CatalogError::NotFound(product_id),
            Some(p) if p.deleted => CatalogError::Unavailable(product_id),
            Some(p) => CatalogError::OutOfStock {
                product_id,
                requested: quantity,
                available: p.quantity,
            },
        })
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, product: &Product) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, unit_price, quantity, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price.minor())
        .bind(product.quantity)
        .bind(product.deleted)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(Product::from))
    }

    async fn update(&self, product: &Product) -> Result<(), CatalogError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, unit_price = $4, quantity = $5,
                deleted = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price.minor())
        .bind(product.quantity)
        .bind(product.deleted)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(product.id));
        }
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Product>, CatalogError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted = FALSE")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE deleted = FALSE ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Page::new(
            rows.into_iter().map(Product::from).collect(),
            page,
            total as u64,
        ))
    }

    async fn search(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, CatalogError> {
        // Conjunctive filter with NULL meaning "don't care", so one statement
        // covers every combination.
        const WHERE: &str = r#"
            deleted = FALSE
            AND ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
            AND ($2::BIGINT IS NULL OR unit_price >= $2)
            AND ($3::BIGINT IS NULL OR unit_price <= $3)
            AND ($4::BOOLEAN IS NOT TRUE OR quantity > 0)
        "#;

        let name = filter.name.as_deref();
        let min_price = filter.min_price.map(|m| m.minor());
        let max_price = filter.max_price.map(|m| m.minor());

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {WHERE}"))
                .bind(name)
                .bind(min_price)
                .bind(max_price)
                .bind(filter.available)
                .fetch_one(&self.pool)
                .await
                .map_err(storage_err)?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT * FROM products WHERE {WHERE} ORDER BY name LIMIT $5 OFFSET $6"
        ))
        .bind(name)
        .bind(min_price)
        .bind(max_price)
        .bind(filter.available)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Page::new(
            rows.into_iter().map(Product::from).collect(),
            page,
            total as u64,
        ))
    }

    async fn apply_reservation(&self, product_id: Uuid, quantity: i64) -> Result<(), CatalogError> {
        if quantity <= 0 {
            return Err(CatalogError::InvalidQuantity { product_id, quantity });
        }
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_decrement(product_id, quantity).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    let rejection = self
                        .classify_rejection(product_id, quantity)
                        .await
                        .map_err(storage_err)?;
                    return Err(rejection);
                }
                Err(e) if is_serialization_failure(&e) && attempt < RESERVE_ATTEMPTS => {
                    warn!(%product_id, attempt, "reservation write lost a race, retrying");
                }
                Err(e) if is_serialization_failure(&e) => {
                    // Contention exhausted the attempts; report it as stock
                    // pressure rather than a storage fault.
                    let available = self
                        .find(product_id)
                        .await?
                        .map(|p| p.quantity)
                        .unwrap_or(0);
                    return Err(CatalogError::OutOfStock {
                        product_id,
                        requested: quantity,
                        available,
                    });
                }
                Err(e) => return Err(storage_err(e)),
            }
        }
    }

    async fn release_reservation(
        &self,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(product_id));
        }
        Ok(())
    }
}
