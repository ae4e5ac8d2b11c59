// src/db/repositories/cart_repository.rs
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPool, Error as SqlxError};
use uuid::Uuid;

use crate::db::models::{Cart, CartItem};

#[async_trait]
pub trait CartRepositoryTrait: Send + Sync {
    async fn get_or_create(&self, user_id: Uuid) -> Result<Cart, SqlxError>;
    async fn items_for(&self, cart_id: Uuid) -> Result<Vec<CartItem>, SqlxError>;
    async fn add_item(
        &self,
        cart_id: Uuid,
        product_sku: &str,
        product_name: &str,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartItem, SqlxError>;
    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<u64, SqlxError>;
    async fn clear(&self, cart_id: Uuid) -> Result<(), SqlxError>;
    async fn touch(&self, cart_id: Uuid) -> Result<Cart, SqlxError>;
}

pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepositoryTrait for CartRepository {
    /// One cart per user, created on first access. The unique index on
    /// `user_id` makes the insert race-safe.
    async fn get_or_create(&self, user_id: Uuid) -> Result<Cart, SqlxError> {
        if let Some(cart) = sqlx::query_as::<_, Cart>(
            r#"
            SELECT * FROM carts WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(cart);
        }

        sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn items_for(&self, cart_id: Uuid) -> Result<Vec<CartItem>, SqlxError> {
        sqlx::query_as::<_, CartItem>(
            r#"
            SELECT * FROM cart_items
            WHERE cart_id = $1
            ORDER BY product_sku
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Adding a SKU already in the cart increments its quantity instead of
    /// producing a duplicate line.
    async fn add_item(
        &self,
        cart_id: Uuid,
        product_sku: &str,
        product_name: &str,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartItem, SqlxError> {
        sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (id, cart_id, product_sku, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cart_id, product_sku)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                          unit_price = EXCLUDED.unit_price
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(product_sku)
        .bind(product_name)
        .bind(quantity)
        .bind(unit_price)
        .fetch_one(&self.pool)
        .await
    }

    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<u64, SqlxError> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE id = $1 AND cart_id = $2
            "#,
        )
        .bind(item_id)
        .bind(cart_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn clear(&self, cart_id: Uuid) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            DELETE FROM cart_items WHERE cart_id = $1
            "#,
        )
        .bind(cart_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bump `updated_at` after an item mutation and return the fresh row.
    async fn touch(&self, cart_id: Uuid) -> Result<Cart, SqlxError> {
        sqlx::query_as::<_, Cart>(
            r#"
            UPDATE carts
            SET updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cart_id)
        .fetch_one(&self.pool)
        .await
    }
}
