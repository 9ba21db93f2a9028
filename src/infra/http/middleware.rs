use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::domain::entities::UserId;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Set on the response by the session layer when the request was signed in.
#[derive(Clone, Copy, Debug)]
pub struct SessionActor {
    pub user_id: UserId,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log every response with its route template and signed-in user. Failed
/// responses also carry the diagnostic chain their handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let user_id = response
        .extensions()
        .get::<SessionActor>()
        .map(|actor| actor.user_id);

    if status.is_client_error() || status.is_server_error() {
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
                target = "iscogram::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                user_id = ?user_id,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "iscogram::http::response",
                status = status.as_u16(),
                method = %method,
                route = %route,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                user_id = ?user_id,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                request_id = request_id,
                "client request error",
            );
        }
    } else {
        debug!(
            target = "iscogram::http::response",
            status = status.as_u16(),
            method = %method,
            route = %route,
            user_id = ?user_id,
            elapsed_ms = elapsed_ms,
            request_id = request_id,
            "request served",
        );
    }

    response
}
