use crate::{
    auth::token::CatalogAccess,
    error::ApiResult,
    repository_from_request,
    rest_api::{Page, Paging},
    state::AppState,
    validate::Garde,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::debug;
use yamdb_dal::title::{CreateTitle, TitleFilter, TitleRepository, UpdateTitle};
#[cfg(feature = "openapi")]
use yamdb_dal::title::Title;

repository_from_request!(TitleRepository);

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Title", operation_id = "listTitle",
    params(Paging, TitleFilter), responses((status = StatusCode::OK, description = "List paginated", body = Page<Title>))))]
pub async fn list(
    repository: TitleRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
    filter: Result<Query<TitleFilter>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(filter) = filter?;
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params, &filter).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Title", operation_id = "createTitle",
    request_body = CreateTitle,
    responses((status = StatusCode::CREATED, description = "Created title", body = Title))))]
pub async fn create(
    CatalogAccess(actor): CatalogAccess,
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.create(payload).await?;
    debug!("{} created title {}", actor.username(), record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{title_id}", tag = "Title", operation_id = "getTitle",
    responses((status = StatusCode::OK, description = "Get one", body = Title))))]
pub async fn get_one(
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    let record = repository.get(id).await?;
    Ok((StatusCode::OK, Json(record)))
}

/// Both PUT and PATCH update only fields present in payload
#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/{title_id}", tag = "Title", operation_id = "updateTitle",
    request_body = UpdateTitle,
    responses((status = StatusCode::OK, description = "Updated title", body = Title))))]
pub async fn update(
    CatalogAccess(actor): CatalogAccess,
    Path(id): Path<i64>,
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<UpdateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let record = repository.update(id, payload).await?;
    debug!("{} updated title {id}", actor.username());
    Ok((StatusCode::OK, Json(record)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{title_id}", tag = "Title", operation_id = "deleteTitle",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted with all its reviews"))))]
pub async fn delete(
    CatalogAccess(actor): CatalogAccess,
    Path(id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;
    debug!("{} deleted title {id}", actor.username());
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

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{title_id}",
            get(get_one).put(update).patch(update).delete(delete),
        )
}
