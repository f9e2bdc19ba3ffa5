use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_core::{Money, Page, PageRequest};
use mercato_order::{Order, OrderError, OrderLine, OrderStatus, OrderStore};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    owner_id: Uuid,
    owner_name: String,
    subtotal: i64,
    discount: i64,
    grand_total: i64,
    coupon_code: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i64,
    unit_price: i64,
    discount_share: i64,
    line_total: i64,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            discount_share: Money::from_minor(row.discount_share),
            line_total: Money::from_minor(row.line_total),
        }
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<Order, OrderError> {
    let status = OrderStatus::parse(&row.status)
        .ok_or_else(|| OrderError::Storage(format!("unknown order status: {}", row.status)))?;
    Ok(Order {
        id: row.id,
        owner_id: row.owner_id,
        owner_name: row.owner_name,
        lines,
        subtotal: Money::from_minor(row.subtotal),
        discount: Money::from_minor(row.discount),
        grand_total: Money::from_minor(row.grand_total),
        coupon_code: row.coupon_code,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn storage_err(e: sqlx::Error) -> OrderError {
    OrderError::Storage(e.to_string())
}

impl PgOrderStore {
    /// Fetches the lines for a page of order rows and stitches them in.
    async fn with_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, OrderError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let line_rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT * FROM order_lines WHERE order_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for line in line_rows {
            by_order
                .entry(line.order_id)
                .or_default()
                .push(OrderLine::from(line));
        }

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = by_order.remove(&row.id).unwrap_or_default();
            orders.push(assemble(row, lines)?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, owner_name, subtotal, discount, grand_total,
                                coupon_code, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.owner_id)
        .bind(&order.owner_name)
        .bind(order.subtotal.minor())
        .bind(order.discount.minor())
        .bind(order.grand_total.minor())
        .bind(&order.coupon_code)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, product_name, quantity,
                                         unit_price, discount_share, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price.minor())
            .bind(line.discount_share.minor())
            .bind(line.line_total.minor())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        let Some(row) = row else { return Ok(None) };

        let lines = sqlx::query_as::<_, OrderLineRow>(
            "SELECT * FROM order_lines WHERE order_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?
        .into_iter()
        .map(OrderLine::from)
        .collect();

        Ok(Some(assemble(row, lines)?))
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Order>, OrderError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE owner_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Page::new(self.with_lines(rows).await?, page, total as u64))
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Order>, OrderError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Page::new(self.with_lines(rows).await?, page, total as u64))
    }
}
