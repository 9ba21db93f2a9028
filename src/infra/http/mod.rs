mod account;
mod actions;
mod middleware;
mod public;
mod session;
mod state;

pub use middleware::SessionActor;
pub use session::SignedIn;
pub use state::HttpState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::{error::ErrorReport, repos::RepoError};

use self::middleware::{log_responses, set_request_context};

/// Room for the multipart framing and text fields around the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let upload_body_limit = state
        .upload_limit
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/",
            get(public::index)
                .merge(post(actions::create_post).layer(DefaultBodyLimit::max(upload_body_limit))),
        )
        .route("/initialize", get(actions::initialize))
        .route("/login", post(account::login))
        .route("/register", post(account::register))
        .route("/logout", get(account::logout))
        .route("/posts", get(public::posts_before))
        .route("/posts/{id}", get(public::post_detail))
        .route("/image/{file}", get(public::image))
        .route("/comment", post(actions::create_comment))
        .route(
            "/admin/banned",
            get(actions::admin_banned).post(actions::admin_ban),
        )
        .route("/_health/db", get(public::db_health))
        .route("/{profile}", get(public::profile))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session::attach_session,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
