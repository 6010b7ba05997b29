use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Route template of the request, never the concrete path. Render paths carry a
/// valid token in a segment.
pub(crate) fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let route = route_label(&request);
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "edgeblock::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "edgeblock::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::HeaderValue, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn echo_route(request: Request<Body>, next: Next) -> Response {
        let label = route_label(&request);
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&label) {
            response.headers_mut().insert("x-route", value);
        }
        response
    }

    async fn route_header(uri: &str) -> Option<String> {
        let app = Router::new()
            .route("/fragments/{token}/{block_id}", get(|| async { "ok" }))
            .layer(from_fn(echo_route));
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = app.oneshot(request).await.expect("router should respond");
        response
            .headers()
            .get("x-route")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn logged_route_hides_the_token_segment() {
        let label = route_header("/fragments/0123abcd/%2Fcms%2Ffooter").await;

        assert_eq!(label.as_deref(), Some("/fragments/{token}/{block_id}"));
    }

    #[tokio::test]
    async fn unrouted_requests_are_labelled_unmatched() {
        let label = route_header("/elsewhere/0123abcd").await;

        assert_eq!(label.as_deref(), Some("unmatched"));
    }
}
