use actix_web::{web, HttpResponse};

use super::handlers::{cart, order};
use crate::api::AppState;
use crate::db::check_database_health;

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));

    // All resource routes live under /api/v1
    cfg.service(
        web::scope("/api/v1")
            // Order routes. The collection and the cancel action only accept
            // GET and POST; web::resource answers 405 for anything else.
            .service(
                web::scope("/orders")
                    .service(
                        web::resource("")
                            .route(web::get().to(order::list_orders))
                            .route(web::post().to(order::create_order)),
                    )
                    .service(
                        web::resource("/{id}/cancel").route(web::post().to(order::cancel_order)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(order::get_order))),
            )
            // Cart routes
            .service(
                web::scope("/cart")
                    .service(web::resource("").route(web::get().to(cart::get_cart)))
                    .service(
                        web::resource("/items").route(web::post().to(cart::add_cart_item)),
                    )
                    .service(
                        web::resource("/items/{id}/remove")
                            .route(web::post().to(cart::remove_cart_item)),
                    )
                    .service(web::resource("/clear").route(web::post().to(cart::clear_cart))),
            ),
    );
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    match check_database_health(&state.pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(err) => {
            log::error!("Health check failed: {:#}", err);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "degraded" }))
        }
    }
}
