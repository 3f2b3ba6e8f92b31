//! API routes for the docs RAG server

pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_docs))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let config = state.config();
    axum::Json(serde_json::json!({
        "name": "docs-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Documentation assistant answering from retrieved doc sections",
        "endpoints": {
            "POST /api/query": "Ask a question; the answer streams back as markdown text",
            "GET /api/info": "This description",
            "GET /health": "Liveness probe",
            "GET /ready": "Readiness probe"
        },
        "models": {
            "embedding": config.embeddings.model,
            "completion": config.generation.model
        },
        "retrieval": {
            "top_k": config.vector_index.top_k,
            "context_token_budget": config.context.token_budget
        }
    }))
}
