mod auth;
mod error;
mod model;
mod todos;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header, header::InvalidHeaderValue},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::repository::TaskRepository;

pub use auth::{IdentityVerifier, StaticTokenVerifier};

#[derive(Clone)]
pub struct AppState {
    pub repository: TaskRepository,
    pub verifier: Arc<dyn IdentityVerifier>,
}

/// CORS policy admitting the browser client served from `origin`.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/api/todos/{id}",
            get(todos::get_todo)
                .patch(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cors: CorsLayer,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    log::info!("Task API listening on http://{local_addr}");

    axum::serve(listener, router(state, cors))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Task API stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}
