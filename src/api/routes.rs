//! HTTP router and server setup.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth;
use super::secrets;
use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::vault::Vault;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub vault: Vault,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(&config.database_path).await?;
    tracing::info!(path = %config.database_path.display(), "opened vault database");

    let vault = Vault::new(Arc::new(storage));
    let state = Arc::new(AppState {
        config: config.clone(),
        vault,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full application router for the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login));

    // Identity is resolved here once per request; the vault re-verifies
    // ownership on every call.
    let secret_routes = Router::new()
        .route("/list", get(secrets::list_secrets))
        .route("/:id", get(secrets::get_secret))
        .route("/:id", delete(secrets::delete_secret))
        .route("/:id/rename", post(secrets::rename_secret))
        .route("/:id/description", post(secrets::change_description))
        .route("/create/credentials", post(secrets::create_credentials))
        .route("/create/note", post(secrets::create_note))
        .route("/create/blob", post(secrets::create_blob))
        .route("/create/bank_card", post(secrets::create_bank_card))
        .route("/edit/credentials/:id", post(secrets::edit_credentials))
        .route("/edit/note/:id", post(secrets::edit_note))
        .route("/edit/blob/:id", post(secrets::edit_blob))
        .route("/edit/bank_card/:id", post(secrets::edit_bank_card))
        .route("/tag/:id", post(secrets::add_tag))
        .route("/tag/:id", delete(secrets::delete_tag))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::with_identity,
        ));

    public_routes
        .nest("/api/secret", secret_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
