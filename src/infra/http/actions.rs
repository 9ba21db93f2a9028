//! Handlers that mutate the store: posting, commenting, banning, and reset.

use axum::{
    Form, Json,
    extract::State,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form as MultiValueForm, Multipart};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    application::{error::HttpError, posting::NewPost},
    domain::entities::{PostId, UserId, UserRecord},
};

use super::{HttpState, session::SignedIn};

const CREATE_POST_SOURCE: &str = "infra::http::actions::create_post";

#[derive(Default)]
struct PostForm {
    content_type: Option<String>,
    data: Bytes,
    body: String,
    csrf_token: String,
}

async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                error!(
                    target = CREATE_POST_SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                return Err(HttpError::from_error(
                    CREATE_POST_SOURCE,
                    status,
                    "Invalid form data",
                    &err,
                ));
            }
        };

        let name = field.name().map(str::to_string);
        let read_error = |err: axum_extra::extract::multipart::MultipartError| {
            HttpError::from_error(CREATE_POST_SOURCE, err.status(), "Invalid form data", &err)
        };
        match name.as_deref() {
            Some("file") => {
                form.content_type = field.content_type().map(str::to_string);
                form.data = field.bytes().await.map_err(read_error)?;
            }
            Some("body") => form.body = field.text().await.map_err(read_error)?,
            Some("csrf_token") => form.csrf_token = field.text().await.map_err(read_error)?,
            _ => {}
        }
    }
    Ok(form)
}

/// `POST /` with multipart fields `file`, `body` and `csrf_token`.
pub(super) async fn create_post(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = read_post_form(&mut multipart).await?;
    signed_in.verify_csrf(&form.csrf_token)?;

    let content_type = form.content_type.ok_or_else(|| {
        HttpError::new(
            CREATE_POST_SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "An image file is required",
            "multipart payload has no file field",
        )
    })?;

    let post = state
        .posting
        .create_post(
            &signed_in.user,
            NewPost {
                content_type,
                body: form.body,
                data: form.data,
            },
        )
        .await?;

    let location = format!("/posts/{}", post.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(post)).into_response())
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentForm {
    post_id: String,
    comment: String,
    csrf_token: String,
}

pub(super) async fn create_comment(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Form(form): Form<CommentForm>,
) -> Result<Response, HttpError> {
    signed_in.verify_csrf(&form.csrf_token)?;

    let post_id: PostId = form.post_id.trim().parse().map_err(|err| {
        HttpError::from_error(
            "infra::http::actions::create_comment",
            StatusCode::BAD_REQUEST,
            "post_id must be an integer",
            &err,
        )
    })?;

    let comment = state
        .comments
        .create_comment(&signed_in.user, post_id, &form.comment)
        .await?;

    let location = format!("/posts/{post_id}");
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(comment)).into_response())
}

#[derive(Debug, Serialize)]
pub(super) struct BanPanel {
    users: Vec<UserRecord>,
    csrf_token: String,
}

pub(super) async fn admin_banned(
    State(state): State<HttpState>,
    signed_in: SignedIn,
) -> Result<Json<BanPanel>, HttpError> {
    let users = state.admin.list_active_users(&signed_in.user).await?;
    Ok(Json(BanPanel {
        users,
        csrf_token: signed_in.csrf_token,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct BanForm {
    csrf_token: String,
    #[serde(rename = "uid[]", default)]
    uids: Vec<UserId>,
}

#[derive(Debug, Serialize)]
pub(super) struct BanOutcome {
    banned: usize,
}

pub(super) async fn admin_ban(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    MultiValueForm(form): MultiValueForm<BanForm>,
) -> Result<Json<BanOutcome>, HttpError> {
    signed_in.verify_csrf(&form.csrf_token)?;
    let banned = state.admin.ban(&signed_in.user, &form.uids).await?;
    Ok(Json(BanOutcome { banned }))
}

/// Restore the seed dataset and drop every cached entry.
pub(super) async fn initialize(State(state): State<HttpState>) -> Result<StatusCode, HttpError> {
    const SOURCE: &str = "infra::http::actions::initialize";

    state.maintenance.initialize().await?;

    info!(target = SOURCE, "store and caches reset");
    Ok(StatusCode::OK)
}
