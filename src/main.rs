use actix_web::{middleware, web, App, HttpServer};
use log::{info, warn};
use std::path::Path;

use storefront::api::routes;
use storefront::app_state::AppState;
use storefront::config::AppConfig;

/// log4rs from the configured YAML file, env_logger when it is missing
fn init_logging(config_file: &str) {
    if Path::new(config_file).exists() {
        match log4rs::init_file(config_file, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load log config {}: {}", config_file, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    warn!("Log config {} not loaded, logging to stderr", config_file);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    init_logging(&config.logging.config_file);

    let server = config.server.clone();
    let state = AppState::from_config(config).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    info!("Starting server on {}:{}", server.host, server.port);

    let data = web::Data::new(state);
    let max_payload_size = server.max_payload_size;
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .configure(routes::configure)
    })
    .workers(server.workers)
    .bind((server.host.as_str(), server.port))?
    .run()
    .await
}
