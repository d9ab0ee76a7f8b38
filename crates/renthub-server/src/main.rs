use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use renthub_api::auth::{self, AppState, AppStateInner};
use renthub_api::cache::ListingCache;
use renthub_api::middleware::require_auth;
use renthub_api::{admin, likes, listings};
use renthub_db::admin::{AdminTargets, LOCAL_DB_ENV, PROD_DB_ENV};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "renthub=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RENTHUB_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var(LOCAL_DB_ENV).unwrap_or_else(|_| "renthub.db".into());
    let host = std::env::var("RENTHUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RENTHUB_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = renthub_db::Database::open(&PathBuf::from(&db_path))?;

    // The view-db surface opens its own short-lived connections; its
    // local target follows the app database unless overridden.
    let admin_targets = AdminTargets::new(
        Some(PathBuf::from(&db_path)),
        std::env::var_os(PROD_DB_ENV).map(PathBuf::from),
    );

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        admin: admin_targets,
        cache: ListingCache::default(),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/api/renthub", get(listings::list_listings))
        .route("/api/renthub", post(listings::create_listing))
        .route("/api/renthub/{id}", put(listings::update_listing))
        .route("/api/renthub/{id}", delete(listings::delete_listing))
        .route("/api/renthub/{id}/public", post(listings::toggle_public))
        .route("/api/renthub/{id}/favorite", post(listings::toggle_favorite))
        .route("/api/renthub/{id}/like", post(likes::toggle_like))
        .route("/api/view-db", get(admin::view_db))
        .route("/api/view-db/rows", post(admin::create_row))
        .route("/api/view-db/rows", put(admin::update_row))
        .route("/api/view-db/rows", delete(admin::delete_row))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("RentHub server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
