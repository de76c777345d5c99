mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod routes;
mod versioning;
mod views;

use std::error::Error;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cache::ResponseCache;
use crate::config::Settings;
use crate::db::init_db;
use crate::routes::{
    all_authors, all_books, create_author, create_book, delete_author, delete_book, detail_author,
    detail_book, get_sf_doc, health_check, update_author, update_book,
};
use crate::versioning::VersionResolver;

#[derive(Clone)]
pub struct InnerState {
    pub db: PgPool,
    pub cache: ResponseCache,
    pub http_client: reqwest::Client,
    pub versioning: VersionResolver,
    pub settings: Arc<Settings>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_bookshelf=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Arc::new(Settings::from_env()?);

    let db = init_db(&settings.database_url).await?;
    let cache = ResponseCache::connect(&settings.redis_url)?;
    let versioning = VersionResolver::new(settings.default_api_version.clone());

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app_state = InnerState {
        db,
        cache,
        http_client: reqwest::Client::new(),
        versioning,
        settings: settings.clone(),
    };

    let app = Router::new()
        .route("/api/books", get(all_books).post(create_book))
        .route(
            "/api/books/:id",
            get(detail_book).put(update_book).delete(delete_book),
        )
        .route("/api/authors", get(all_authors).post(create_author))
        .route(
            "/api/authors/:id",
            get(detail_author).put(update_author).delete(delete_author),
        )
        .route("/api/external/getSfDoc", get(get_sf_doc))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(prometheus_layer)
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .expect("Could not initialize TcpListener");

    tracing::debug!(
        "listening on {}",
        listener
            .local_addr()
            .expect("Could not convert listener address to local address")
    );

    axum::serve(listener, app)
        .await
        .expect("Could not successfully connect");

    Ok(())
}
