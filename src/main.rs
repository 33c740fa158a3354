use dotenvy::dotenv;
use orders_api::{build_server, build_service, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let service = build_service(&config).map_err(|e| {
        log::error!("order store is not reachable: {e}");
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e)
    })?;

    log::info!(
        "Starting server at http://{}:{} ({:?} store)",
        config.host,
        config.port,
        config.store_backend
    );

    build_server(service, &config.host, config.port, config.shutdown_timeout)?.await
}
