// src/db/repositories/order_repository.rs
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPool, Error as SqlxError};
use uuid::Uuid;

use crate::db::models::{Order, OrderItem, OrderStatus};

/// Validated input for one order line, ready to persist.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, SqlxError>;
    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, SqlxError>;
    async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, SqlxError>;
    async fn create(
        &self,
        user_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<(Order, Vec<OrderItem>), SqlxError>;
    async fn mark_canceled(&self, id: Uuid) -> Result<Option<Order>, SqlxError>;
}

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    /// Every query is scoped to the owning user; other users' orders are
    /// indistinguishable from nonexistent ones.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, SqlxError> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, SqlxError> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, SqlxError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT * FROM order_items
            WHERE order_id = ANY($1)
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Persist an order and all of its items in one transaction; a failure
    /// anywhere rolls the whole write back.
    async fn create(
        &self,
        user_id: Uuid,
        items: &[NewOrderItem],
    ) -> Result<(Order, Vec<OrderItem>), SqlxError> {
        let total: Decimal = items.iter().map(NewOrderItem::line_total).sum();

        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, user_id, status, total)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(OrderStatus::Pending)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        let mut persisted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (id, order_id, product_sku, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(&item.product_sku)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await?;

            persisted.push(row);
        }

        tx.commit().await?;

        Ok((order, persisted))
    }

    /// Flip an order to canceled. The status guard makes the transition
    /// one-way even under concurrent cancels; a caller that loses the race
    /// gets `None` back.
    async fn mark_canceled(&self, id: Uuid) -> Result<Option<Order>, SqlxError> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status <> $1
            RETURNING *
            "#,
        )
        .bind(OrderStatus::Canceled)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_line_total() {
        let item = NewOrderItem {
            product_sku: "SKU-9".to_string(),
            product_name: "Gadget".to_string(),
            quantity: 4,
            unit_price: Decimal::new(999, 2), // 9.99
        };
        assert_eq!(item.line_total(), Decimal::new(3996, 2));
    }

    #[test]
    fn test_order_total_sums_lines() {
        let items = vec![
            NewOrderItem {
                product_sku: "A".to_string(),
                product_name: "A".to_string(),
                quantity: 2,
                unit_price: Decimal::new(500, 2),
            },
            NewOrderItem {
                product_sku: "B".to_string(),
                product_name: "B".to_string(),
                quantity: 1,
                unit_price: Decimal::new(150, 2),
            },
        ];
        let total: Decimal = items.iter().map(NewOrderItem::line_total).sum();
        assert_eq!(total, Decimal::new(1150, 2));
    }
}
