//! Question endpoint streaming markdown answers

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures_util::TryStreamExt;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::QueryRequest;

/// POST /api/query - answer a question as a text stream
pub async fn query_docs(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::info!("Unreadable query body: {}", rejection);
            return Err(Error::user("Missing query in request data"));
        }
    };

    tracing::info!(
        "Query: \"{}\"",
        request.prompt.as_deref().unwrap_or_default().trim()
    );

    let answer = state.pipeline().answer(request.prompt.as_deref()).await?;
    let body = Body::from_stream(answer.into_stream().map_ok(Bytes::from));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
