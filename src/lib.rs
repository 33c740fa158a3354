pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;

use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use application::order_service::{DynOrderService, OrderService};
pub use config::{Config, StoreBackend};
pub use db::{create_pool, RedisPool};

use domain::ports::OrderRepository;
use infrastructure::order_repo::KvOrderRepository;
use infrastructure::store::{IndexSet, MemoryStore, OrderStore, RedisStore, StoreError};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::health,
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
    ),
    components(schemas(
        handlers::orders::OrderRequest,
        handlers::orders::LineItemRequest,
        handlers::orders::OrderResponse,
        handlers::orders::LineItemResponse,
        handlers::orders::ListOrdersResponse,
    )),
    tags(
        (name = "orders", description = "Order storage"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Registers every HTTP route. Expects a [`DynOrderService`] in app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(errors::path_error_handler))
        .route("/", web::get().to(handlers::orders::index))
        .route("/health", web::get().to(handlers::orders::health))
        .service(
            web::scope("/orders")
                .route("", web::post().to(handlers::orders::create_order))
                .route("", web::get().to(handlers::orders::list_orders))
                .route("/{id}", web::get().to(handlers::orders::get_order))
                .route("/{id}", web::put().to(handlers::orders::update_order))
                .route("/{id}", web::delete().to(handlers::orders::delete_order)),
        );
}

/// Builds the order service for the configured store backend and checks
/// that the store answers.
pub fn build_service(config: &Config) -> Result<DynOrderService, StoreError> {
    let index = IndexSet::new(config.index_key.clone());
    let repo: Box<dyn OrderRepository> = match config.store_backend {
        StoreBackend::Redis => {
            let pool = create_pool(&config.redis_url, config.pool_size, config.store_timeout)?;
            let store = RedisStore::new(pool, index, config.store_timeout);
            store.ping()?;
            Box::new(KvOrderRepository::new(store))
        }
        StoreBackend::Memory => {
            log::warn!("using the in-memory order store; data is lost on exit");
            Box::new(KvOrderRepository::new(MemoryStore::with_index(index)))
        }
    };
    Ok(OrderService::new(repo))
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server. On SIGINT/SIGTERM in-flight requests get
/// `shutdown_timeout` to finish.
pub fn build_server(
    service: DynOrderService,
    host: &str,
    port: u16,
    shutdown_timeout: Duration,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .configure(routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .shutdown_timeout(shutdown_timeout.as_secs())
    .bind((host.to_string(), port))?
    .run())
}
