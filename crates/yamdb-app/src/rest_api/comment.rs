use crate::{
    error::ApiResult,
    policy::{authorize_target, Action, Scope},
    repository_from_request,
    rest_api::{Page, Paging},
    state::AppState,
    validate::{Deferred, Garde},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::{Method, StatusCode};
#[cfg(feature = "openapi")]
use yamdb_dal::comment::Comment;
use yamdb_dal::comment::{CommentRepository, CreateComment, UpdateComment};
use yamdb_types::claim::ApiClaim;

repository_from_request!(CommentRepository);

const COMMENTS_PATH: &str = "/titles/{title_id}/reviews/{review_id}/comments";
const COMMENT_PATH: &str = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}";

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/titles/{title_id}/reviews/{review_id}/comments", tag = "Comment", operation_id = "listComment",
    params(Paging), responses((status = StatusCode::OK, description = "Comments of review", body = Page<Comment>),
        (status = StatusCode::NOT_FOUND, description = "No such review for this title"))))]
pub async fn list(
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(title_id, review_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "/titles/{title_id}/reviews/{review_id}/comments", tag = "Comment", operation_id = "createComment",
    request_body = CreateComment,
    responses((status = StatusCode::CREATED, description = "Created comment", body = Comment))))]
pub async fn create(
    actor: ApiClaim,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository
        .create(title_id, review_id, actor.uid, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comment", operation_id = "getComment",
    responses((status = StatusCode::OK, description = "Get one", body = Comment))))]
pub async fn get_one(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(title_id, review_id, comment_id).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comment", operation_id = "updateComment",
    request_body = UpdateComment,
    responses((status = StatusCode::OK, description = "Updated comment", body = Comment),
        (status = StatusCode::FORBIDDEN, description = "Not author nor moderator"))))]
pub async fn update(
    actor: ApiClaim,
    method: Method,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
    payload: Deferred<UpdateComment>,
) -> ApiResult<impl IntoResponse> {
    authorize_target(
        &actor,
        Scope::Authored,
        Action::from(&method),
        repository.get(title_id, review_id, comment_id),
        |comment| comment.author_id,
    )
    .await?;
    let payload = payload.into_valid()?;
    let record = repository
        .update(title_id, review_id, comment_id, payload)
        .await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}", tag = "Comment", operation_id = "deleteComment",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted"))))]
pub async fn delete(
    actor: ApiClaim,
    method: Method,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    authorize_target(
        &actor,
        Scope::Authored,
        Action::from(&method),
        repository.get(title_id, review_id, comment_id),
        |comment| comment.author_id,
    )
    .await?;
    repository.delete(title_id, review_id, comment_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list, create, get_one, update, delete))]
struct ApiDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ApiDocs::openapi()
}

/// Router with full paths, to be merged into API router
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(COMMENTS_PATH, get(list).post(create))
        .route(
            COMMENT_PATH,
            get(get_one).put(update).patch(update).delete(delete),
        )
}
