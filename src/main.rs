use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use rental_ranker::config::{LoggingSettings, Settings};
use rental_ranker::core::Recommender;
use rental_ranker::models::ScoringWeights;
use rental_ranker::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use rental_ranker::services::{connect_store, CacheManager};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_cache(settings: &Settings) -> Option<Arc<CacheManager>> {
    if !settings.cache.enabled {
        return None;
    }

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match &settings.cache.redis_url {
        Some(url) => match CacheManager::with_redis(url, l1_cache_size, cache_ttl).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::in_memory(l1_cache_size, cache_ttl),
    };

    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
        l1_cache_size,
        cache_ttl,
        cache.has_redis()
    );

    Some(Arc::new(cache))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings.logging);

    info!("Starting rental recommendation service...");

    let store = connect_store(&settings.store).await.map_err(|e| {
        error!("Failed to initialize listing store: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Listing store initialized ({})", store.name());

    let cache = build_cache(&settings).await;

    // Initialize recommender with configured weights
    let weights = ScoringWeights::from(&settings.scoring.weights);
    let recommender = Recommender::new(weights, settings.ranking.unrated_listings);

    info!("Recommender initialized with weights: {:?}", weights);

    // Build application state
    let mut app_state = AppState::new(store, recommender, settings.ranking.limits());
    if let Some(cache) = cache {
        app_state = app_state.with_cache(cache);
    }

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
