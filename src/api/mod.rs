pub mod handlers;
pub mod middleware;
pub mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;
use sqlx::PgPool;

use crate::config::Config;
use middleware::{auth::AuthenticationMiddleware, logging::RequestLogger};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

pub async fn run(config: Config, pool: PgPool) -> std::io::Result<()> {
    let server_address = format!("{}:{}", config.api_host, config.api_port);

    info!("Starting API server on {}", server_address);

    let workers = config.api_workers;
    let state = AppState {
        pool,
        config: config.clone(),
    };

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&state.config.cors_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        // Registration order is inside-out: CORS runs first so preflight
        // requests never reach the authentication layer.
        App::new()
            .wrap(AuthenticationMiddleware::new(&state.config))
            .wrap(RequestLogger::new())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::register_routes)
    })
    .bind(server_address)?
    .workers(workers)
    .run()
    .await
}
