use actix_cors::Cors;
use actix_web::middleware::from_fn;
use actix_web::{http::header, web, App, HttpServer};
use dotenv::dotenv;
use gr8diy_api::{middleware::request_logging, AppError, AppState, Settings};
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn build_cors(config: &Settings) -> Cors {
    let cors = config
        .cors_origins()
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

    cors.allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers(vec!["X-RateLimit-Limit", "X-RateLimit-Remaining", "X-RateLimit-Window"])
        .supports_credentials()
        .max_age(config.cors.max_age as usize)
}

#[actix_web::main]
async fn main() -> gr8diy_api::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Starting {} v{}", config.app_name, config.app_version);
    info!("Environment: {}", config.environment);
    if config.is_development() {
        info!("Rate limiting is disabled in development");
    }

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!(
        "Listening on http://{}:{}{}",
        config.server.host, config.server.port, config.server.api_prefix
    );

    let server_state = state.clone();
    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&server_config))
            .wrap(from_fn(request_logging))
            .app_data(server_state.clone())
            .configure(gr8diy_api::configure(server_config.server.api_prefix.clone()))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    info!("Shutting down...");
    state.shutdown().await?;

    Ok(())
}
