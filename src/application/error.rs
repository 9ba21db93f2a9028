use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, admin::AdminError, comments::CommentError, feed::FeedError,
        maintenance::MaintenanceError, posting::PostingError, repos::RepoError,
        timeline::TimelineError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// An error response whose body only carries `public_message`.
///
/// The full error chain travels in an [`ErrorReport`] response extension and
/// is logged by the response middleware, never sent to the client.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message }));
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            "database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            message,
        ),
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        // A missing author row is an integrity fault, so both kinds are 500s.
        HttpError::internal("application::feed::hydrate", &error)
    }
}

impl From<TimelineError> for HttpError {
    fn from(error: TimelineError) -> Self {
        const SOURCE: &str = "application::timeline";
        match error {
            TimelineError::NotFound(entity) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                format!("{entity} not found"),
            ),
            TimelineError::Feed(err) => err.into(),
            TimelineError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        const SOURCE: &str = "application::accounts";
        match error {
            AccountError::Invalid(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Account name must be at least 3 characters and password at least 6",
                &err,
            ),
            AccountError::AccountTaken(name) => HttpError::new(
                SOURCE,
                StatusCode::CONFLICT,
                "Account name is already taken",
                format!("account name `{name}` is taken"),
            ),
            AccountError::InvalidCredentials => HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Account name or password is incorrect",
                "invalid credentials",
            ),
            AccountError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<PostingError> for HttpError {
    fn from(error: PostingError) -> Self {
        const SOURCE: &str = "application::posting";
        match error {
            PostingError::UnsupportedImage => HttpError::new(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Only jpg, png and gif images can be posted",
                "unsupported content type",
            ),
            PostingError::EmptyImage => HttpError::new(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "An image file is required",
                "empty image payload",
            ),
            PostingError::ImageTooLarge { limit } => HttpError::new(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Image file is too large",
                format!("image exceeds {limit} bytes"),
            ),
            PostingError::NotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                "image not found",
            ),
            PostingError::Storage(err) => HttpError::internal(SOURCE, &err),
            PostingError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<CommentError> for HttpError {
    fn from(error: CommentError) -> Self {
        match error {
            CommentError::Repo(err) => {
                HttpError::internal("application::comments::create_comment", &err)
            }
        }
    }
}

impl From<AdminError> for HttpError {
    fn from(error: AdminError) -> Self {
        const SOURCE: &str = "application::admin";
        match error {
            AdminError::Forbidden(user_id) => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Administrator access required",
                format!("user {user_id} is not an administrator"),
            ),
            AdminError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<MaintenanceError> for HttpError {
    fn from(error: MaintenanceError) -> Self {
        const SOURCE: &str = "application::maintenance::initialize";
        match error {
            MaintenanceError::Repo(err) => repo_error_to_http(SOURCE, err),
            MaintenanceError::Images(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn server_errors_hide_store_detail() {
        let error = FeedError::StoreUnavailable(RepoError::Persistence(
            "relation \"comments\" does not exist".into(),
        ));

        let response = HttpError::from(error).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .cloned()
            .expect("report attached");
        assert!(report.messages.iter().any(|m| m.contains("comments")));
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn missing_author_is_a_server_error() {
        let response = HttpError::from(TimelineError::Feed(FeedError::NotFound {
            entity: "user",
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = HttpError::from(TimelineError::NotFound("post")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
