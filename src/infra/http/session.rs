//! Cookie sessions: resolution middleware and the signed-in extractor.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{Request, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::{
    application::error::HttpError,
    domain::entities::UserRecord,
    infra::sessions::SESSION_COOKIE,
};

use super::{HttpState, middleware::SessionActor};

/// The user behind the request's session cookie.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session_id: String,
    pub user: UserRecord,
    pub csrf_token: String,
}

impl SignedIn {
    /// Reject a form whose token does not match the session's.
    pub fn verify_csrf(&self, token: &str) -> Result<(), HttpError> {
        if bool::from(self.csrf_token.as_bytes().ct_eq(token.as_bytes())) {
            Ok(())
        } else {
            Err(HttpError::new(
                "infra::http::session::verify_csrf",
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid CSRF token",
                format!("csrf token mismatch for user {}", self.user.id),
            ))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SignedIn {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<SignedIn>().cloned().ok_or_else(|| {
            HttpError::new(
                "infra::http::session::signed_in",
                StatusCode::UNAUTHORIZED,
                "Login required",
                "request carries no valid session",
            )
        })
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for SignedIn {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<SignedIn>().cloned())
    }
}

/// Resolve the session cookie into a [`SignedIn`] request extension.
///
/// Sessions whose user row no longer exists are dropped.
pub async fn attach_session(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(session_id) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
    else {
        return next.run(request).await;
    };
    let Some(session) = state.sessions.get(&session_id) else {
        return next.run(request).await;
    };

    match state.accounts.session_user(session.user_id).await {
        Ok(Some(user)) => {
            let actor = SessionActor { user_id: user.id };
            request.extensions_mut().insert(SignedIn {
                session_id,
                user,
                csrf_token: session.csrf_token,
            });
            let mut response = next.run(request).await;
            response.extensions_mut().insert(actor);
            return response;
        }
        Ok(None) => {
            debug!(
                target = "iscogram::http::session",
                user_id = session.user_id,
                "session user no longer exists"
            );
            state.sessions.remove(&session_id);
        }
        Err(err) => return HttpError::from(err).into_response(),
    }

    next.run(request).await
}

pub fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
