use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{application::error::HttpError, domain::entities::UserRecord};

use super::{
    HttpState,
    session::{SignedIn, expired_session_cookie, session_cookie},
};

#[derive(Debug, Deserialize)]
pub(super) struct Credentials {
    account_name: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionBody {
    user: UserRecord,
    csrf_token: String,
}

fn start_session(state: &HttpState, jar: CookieJar, user: UserRecord) -> (CookieJar, SessionBody) {
    let (session_id, session) = state.sessions.create(user.id);
    let jar = jar.add(session_cookie(session_id));
    (
        jar,
        SessionBody {
            user,
            csrf_token: session.csrf_token,
        },
    )
}

pub(super) async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, HttpError> {
    let user = state
        .accounts
        .login(&credentials.account_name, &credentials.password)
        .await?;

    info!(
        target = "iscogram::http::account::login",
        user_id = user.id,
        "user logged in"
    );
    let (jar, body) = start_session(&state, jar, user);
    Ok((jar, Json(body)).into_response())
}

pub(super) async fn register(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Result<Response, HttpError> {
    let user = state
        .accounts
        .register(&credentials.account_name, &credentials.password)
        .await?;

    let (jar, body) = start_session(&state, jar, user);
    Ok((StatusCode::CREATED, jar, Json(body)).into_response())
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    jar: CookieJar,
    signed_in: Option<SignedIn>,
) -> Response {
    if let Some(signed_in) = signed_in {
        state.sessions.remove(&signed_in.session_id);
    }
    (StatusCode::NO_CONTENT, jar.remove(expired_session_cookie())).into_response()
}
