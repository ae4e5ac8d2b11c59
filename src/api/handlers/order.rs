use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::AppState;
use crate::db::models::{Order, OrderItem, OrderStatus};
use crate::db::repositories::order_repository::{
    NewOrderItem, OrderRepository, OrderRepositoryTrait,
};
use crate::error::ApiError;

/// Creation schema: what a client may submit for a new order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CreateOrderRequest {
    /// Validate the payload before anything touches the database.
    pub fn validate(&self) -> Result<Vec<NewOrderItem>, ApiError> {
        if self.items.is_empty() {
            return Err(ApiError::Validation(
                "An order requires at least one item.".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if item.product_sku.trim().is_empty() {
                return Err(ApiError::Validation(
                    "Item product_sku may not be blank.".to_string(),
                ));
            }
            if item.product_name.trim().is_empty() {
                return Err(ApiError::Validation(
                    "Item product_name may not be blank.".to_string(),
                ));
            }
            if item.quantity < 1 {
                return Err(ApiError::Validation(
                    "Item quantity must be at least 1.".to_string(),
                ));
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(ApiError::Validation(
                    "Item unit_price must be greater than zero.".to_string(),
                ));
            }

            items.push(NewOrderItem {
                product_sku: item.product_sku.trim().to_string(),
                product_name: item.product_name.trim().to_string(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        Ok(items)
    }
}

/// Read schema: how an order is rendered in every response.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total: order.total,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        let line_total = item.line_total();
        Self {
            id: item.id,
            product_sku: item.product_sku,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
        }
    }
}

// List the authenticated user's orders
pub async fn list_orders(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let repo = OrderRepository::new(state.pool.clone());

    let orders = repo.list_for_user(user.user_id).await?;
    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in repo.items_for_orders(&ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let body: Vec<OrderResponse> = orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderResponse::from_parts(order, items)
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

// Retrieve one of the authenticated user's orders
pub async fn get_order(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let repo = OrderRepository::new(state.pool.clone());

    let order = repo
        .find_for_user(order_id, user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let items = repo.items_for_orders(&[order.id]).await?;

    Ok(HttpResponse::Ok().json(OrderResponse::from_parts(order, items)))
}

// Create an order; the order row and its items are written in one transaction
pub async fn create_order(
    user: AuthUser,
    req: web::Json<CreateOrderRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let items = req.validate()?;

    let repo = OrderRepository::new(state.pool.clone());
    let (order, items) = repo.create(user.user_id, &items).await?;

    log::info!("Order {} created for user {}", order.id, user.user_id);

    Ok(HttpResponse::Created().json(OrderResponse::from_parts(order, items)))
}

// Cancel an order; re-canceling is rejected
pub async fn cancel_order(
    user: AuthUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let repo = OrderRepository::new(state.pool.clone());

    let order = repo
        .find_for_user(order_id, user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if order.is_canceled() {
        return Err(ApiError::AlreadyCanceled);
    }

    // The guarded update can still come back empty if a concurrent cancel
    // got in between the read and the write.
    let order = repo
        .mark_canceled(order.id)
        .await?
        .ok_or(ApiError::AlreadyCanceled)?;

    log::info!("Order {} canceled by user {}", order.id, user.user_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "canceled"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, unit_price: Decimal) -> OrderItemInput {
        OrderItemInput {
            product_sku: "SKU-1".to_string(),
            product_name: "Widget".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_payload() {
        let req = CreateOrderRequest {
            items: vec![item(2, Decimal::new(1999, 2))],
        };
        let items = req.validate().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn test_validate_rejects_empty_order() {
        let req = CreateOrderRequest { items: vec![] };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let req = CreateOrderRequest {
            items: vec![item(0, Decimal::ONE)],
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let req = CreateOrderRequest {
            items: vec![item(1, Decimal::new(-100, 2))],
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_blank_sku() {
        let req = CreateOrderRequest {
            items: vec![OrderItemInput {
                product_sku: "   ".to_string(),
                product_name: "Widget".to_string(),
                quantity: 1,
                unit_price: Decimal::ONE,
            }],
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_trims_fields() {
        let req = CreateOrderRequest {
            items: vec![OrderItemInput {
                product_sku: " SKU-1 ".to_string(),
                product_name: " Widget ".to_string(),
                quantity: 1,
                unit_price: Decimal::ONE,
            }],
        };
        let items = req.validate().unwrap();
        assert_eq!(items[0].product_sku, "SKU-1");
        assert_eq!(items[0].product_name, "Widget");
    }

    #[test]
    fn test_response_reflects_order_and_items() {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total: Decimal::new(2500, 2),
            created_at: now,
            updated_at: now,
        };
        let items = vec![OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_sku: "SKU-1".to_string(),
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: Decimal::new(1250, 2),
        }];

        let response = OrderResponse::from_parts(order.clone(), items);
        assert_eq!(response.id, order.id);
        assert_eq!(response.status, OrderStatus::Pending);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].line_total, Decimal::new(2500, 2));

        // The owner never appears in the read schema.
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("user_id").is_none());
    }
}
