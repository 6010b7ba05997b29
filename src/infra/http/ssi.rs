use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tracing::debug;

use crate::{
    application::error::HttpError,
    cache::{RenderRequest, SsiFragmentCache, UPDATED_AT_KEY},
};

use super::middleware::{log_responses, set_request_context};

const SOURCE: &str = "infra::http::ssi::render_fragment";

#[derive(Clone)]
pub struct SsiHttpState {
    pub cache: Arc<SsiFragmentCache>,
    pub cache_control: HeaderValue,
}

/// Router exposing the fragment render endpoint under `route_prefix`.
pub fn build_router(state: SsiHttpState, route_prefix: &str) -> Router {
    let render_path = format!(
        "{}/{{token}}/{{block_id}}",
        route_prefix.trim_end_matches('/')
    );

    Router::new()
        .route(&render_path, get(render_fragment))
        .route("/_health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn render_fragment(
    State(state): State<SsiHttpState>,
    Path((token, block_id)): Path<(String, String)>,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> Response {
    let Some(updated_at) = params.remove(UPDATED_AT_KEY) else {
        return HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid fragment request",
            "missing `updated_at` query parameter",
        )
        .into_response();
    };

    let request = RenderRequest::new(token, block_id, updated_at).with_settings(params);

    match state.cache.cache_action(&request).await {
        Ok(fragment) => {
            debug!(
                target = "edgeblock::http::ssi",
                block_id = %fragment.block_id,
                bytes = fragment.html.len(),
                "rendered fragment"
            );
            (
                StatusCode::OK,
                [(CACHE_CONTROL, state.cache_control.clone())],
                Html(fragment.html),
            )
                .into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
