use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::AppState;
use crate::db::models::{Cart, CartItem};
use crate::db::repositories::cart_repository::{CartRepository, CartRepositoryTrait};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl AddCartItemRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.product_sku.trim().is_empty() {
            return Err(ApiError::Validation(
                "product_sku may not be blank.".to_string(),
            ));
        }
        if self.product_name.trim().is_empty() {
            return Err(ApiError::Validation(
                "product_name may not be blank.".to_string(),
            ));
        }
        if self.quantity < 1 {
            return Err(ApiError::Validation(
                "quantity must be at least 1.".to_string(),
            ));
        }
        if self.unit_price <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "unit_price must be greater than zero.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CartResponse {
    pub fn from_parts(cart: Cart, items: Vec<CartItem>) -> Self {
        let subtotal = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        Self {
            id: cart.id,
            items: items
                .into_iter()
                .map(|item| CartItemResponse {
                    id: item.id,
                    product_sku: item.product_sku,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            subtotal,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}

async fn render_cart(repo: &CartRepository, cart: Cart) -> Result<HttpResponse, ApiError> {
    let items = repo.items_for(cart.id).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from_parts(cart, items)))
}

// Fetch the authenticated user's cart, creating it on first access
pub async fn get_cart(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let repo = CartRepository::new(state.pool.clone());
    let cart = repo.get_or_create(user.user_id).await?;
    render_cart(&repo, cart).await
}

// Add an item; an existing SKU has its quantity incremented
pub async fn add_cart_item(
    user: AuthUser,
    req: web::Json<AddCartItemRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let repo = CartRepository::new(state.pool.clone());
    let cart = repo.get_or_create(user.user_id).await?;
    repo.add_item(
        cart.id,
        req.product_sku.trim(),
        req.product_name.trim(),
        req.quantity,
        req.unit_price,
    )
    .await?;

    let cart = repo.touch(cart.id).await?;
    render_cart(&repo, cart).await
}

// Remove a single item from the cart
pub async fn remove_cart_item(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let item_id = path.into_inner();
    let repo = CartRepository::new(state.pool.clone());
    let cart = repo.get_or_create(user.user_id).await?;

    let removed = repo.remove_item(cart.id, item_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound);
    }

    let cart = repo.touch(cart.id).await?;
    render_cart(&repo, cart).await
}

// Empty the cart
pub async fn clear_cart(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let repo = CartRepository::new(state.pool.clone());
    let cart = repo.get_or_create(user.user_id).await?;
    repo.clear(cart.id).await?;

    let cart = repo.touch(cart.id).await?;
    render_cart(&repo, cart).await
}
