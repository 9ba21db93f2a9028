use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    application::{error::HttpError, posting::StoredImage, timeline::ProfileView},
    domain::entities::{HydratedPost, PostId, UserRecord},
};

use super::{HttpState, db_health_response, session::SignedIn};

#[derive(Debug, Serialize)]
pub(super) struct FeedPage {
    posts: Vec<HydratedPost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    me: Option<UserRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csrf_token: Option<String>,
}

impl FeedPage {
    fn new(posts: Vec<HydratedPost>, signed_in: Option<SignedIn>) -> Self {
        let (me, csrf_token) = match signed_in {
            Some(signed_in) => (Some(signed_in.user), Some(signed_in.csrf_token)),
            None => (None, None),
        };
        Self {
            posts,
            me,
            csrf_token,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostsQuery {
    max_created_at: Option<String>,
}

pub(super) async fn index(
    State(state): State<HttpState>,
    signed_in: Option<SignedIn>,
) -> Result<Json<FeedPage>, HttpError> {
    let posts = state.timeline.index().await?;
    Ok(Json(FeedPage::new(posts, signed_in)))
}

pub(super) async fn posts_before(
    State(state): State<HttpState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Vec<HydratedPost>>, HttpError> {
    const SOURCE: &str = "infra::http::public::posts_before";

    let raw = query
        .max_created_at
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "max_created_at is required",
                "missing max_created_at",
            )
        })?;
    let max_created_at = OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "max_created_at must be an RFC 3339 timestamp",
            &err,
        )
    })?;

    Ok(Json(state.timeline.posts_before(max_created_at).await?))
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Path(post_id): Path<PostId>,
    signed_in: Option<SignedIn>,
) -> Result<Json<FeedPage>, HttpError> {
    let post = state.timeline.post_detail(post_id).await?;
    Ok(Json(FeedPage::new(vec![post], signed_in)))
}

#[derive(Debug, Serialize)]
pub(super) struct ProfilePage {
    #[serde(flatten)]
    profile: ProfileView,
    #[serde(skip_serializing_if = "Option::is_none")]
    me: Option<UserRecord>,
}

/// `/@{account_name}`; any other single-segment path is not found.
pub(super) async fn profile(
    State(state): State<HttpState>,
    Path(segment): Path<String>,
    signed_in: Option<SignedIn>,
) -> Result<Json<ProfilePage>, HttpError> {
    let account_name = segment.strip_prefix('@').ok_or_else(|| {
        HttpError::new(
            "infra::http::public::profile",
            StatusCode::NOT_FOUND,
            "Resource not found",
            format!("no route for `/{segment}`"),
        )
    })?;

    let profile = state.timeline.profile(account_name).await?;
    Ok(Json(ProfilePage {
        profile,
        me: signed_in.map(|signed_in| signed_in.user),
    }))
}

/// `/image/{post_id}.{ext}`.
pub(super) async fn image(
    State(state): State<HttpState>,
    Path(file): Path<String>,
) -> Result<Response, HttpError> {
    let (post_id, extension) = file
        .split_once('.')
        .and_then(|(id, ext)| id.parse::<PostId>().ok().map(|id| (id, ext)))
        .ok_or_else(|| {
            HttpError::new(
                "infra::http::public::image",
                StatusCode::NOT_FOUND,
                "Resource not found",
                format!("malformed image name `{file}`"),
            )
        })?;

    let stored = state.posting.image(post_id, extension).await?;
    Ok(image_response(stored))
}

fn image_response(image: StoredImage) -> Response {
    let length = image.data.len();
    (
        [
            (CONTENT_TYPE, image.mime.to_string()),
            (CONTENT_LENGTH, length.to_string()),
            (CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        image.data,
    )
        .into_response()
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}
