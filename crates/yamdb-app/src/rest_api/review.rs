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
use tracing::debug;
use yamdb_dal::review::{CreateReview, ReviewRepository, UpdateReview};
#[cfg(feature = "openapi")]
use yamdb_dal::review::Review;
use yamdb_types::claim::ApiClaim;

repository_from_request!(ReviewRepository);

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/titles/{title_id}/reviews", tag = "Review", operation_id = "listReview",
    params(Paging), responses((status = StatusCode::OK, description = "Reviews of title", body = Page<Review>),
        (status = StatusCode::NOT_FOUND, description = "No such title"))))]
pub async fn list(
    Path(title_id): Path<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(title_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "/titles/{title_id}/reviews", tag = "Review", operation_id = "createReview",
    request_body = CreateReview,
    responses((status = StatusCode::CREATED, description = "Created review", body = Review),
        (status = StatusCode::BAD_REQUEST, description = "Invalid score or already reviewed"))))]
pub async fn create(
    actor: ApiClaim,
    Path(title_id): Path<i64>,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(title_id, actor.uid, payload).await?;
    debug!("{} reviewed title {title_id}", actor.username());
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/titles/{title_id}/reviews/{review_id}", tag = "Review", operation_id = "getReview",
    responses((status = StatusCode::OK, description = "Get one", body = Review))))]
pub async fn get_one(
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(title_id, review_id).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/titles/{title_id}/reviews/{review_id}", tag = "Review", operation_id = "updateReview",
    request_body = UpdateReview,
    responses((status = StatusCode::OK, description = "Updated review", body = Review),
        (status = StatusCode::FORBIDDEN, description = "Not author nor moderator"))))]
pub async fn update(
    actor: ApiClaim,
    method: Method,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
    payload: Deferred<UpdateReview>,
) -> ApiResult<impl IntoResponse> {
    authorize_target(
        &actor,
        Scope::Authored,
        Action::from(&method),
        repository.get(title_id, review_id),
        |review| review.author_id,
    )
    .await?;
    let payload = payload.into_valid()?;
    let record = repository.update(title_id, review_id, payload).await?;
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/titles/{title_id}/reviews/{review_id}", tag = "Review", operation_id = "deleteReview",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted with its comments"))))]
pub async fn delete(
    actor: ApiClaim,
    method: Method,
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    authorize_target(
        &actor,
        Scope::Authored,
        Action::from(&method),
        repository.get(title_id, review_id),
        |review| review.author_id,
    )
    .await?;
    repository.delete(title_id, review_id).await?;
    debug!("{} deleted review {review_id}", actor.username());
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
        .route("/titles/{title_id}/reviews", get(list).post(create))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(get_one).put(update).patch(update).delete(delete),
        )
}
