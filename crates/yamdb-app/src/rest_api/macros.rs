/// Generates handlers and router for catalog entity addressed by slug.
///
/// Expects `Create$entity` and `$entity Repository` in scope, plus `$entity` with `openapi` feature.
#[macro_export]
macro_rules! slug_api {
    ($entity:ident) => {
        type EntityRepository = paste::paste! {[<$entity Repository>]};
        $crate::repository_from_request!(EntityRepository);

        pub mod slug_api {
            use super::*;
            use $crate::auth::token::CatalogAccess;
            use $crate::error::ApiResult;
            use $crate::rest_api::{Page, Paging};
            use $crate::state::AppState;
            use $crate::validate::Garde;
            use axum::{
                extract::{Path, Query, State},
                response::IntoResponse,
                Json,
            };
            use http::StatusCode;
            use tracing::debug;

            type CreateEntity = paste::paste! {[<Create $entity>]};

            #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = stringify!($entity), operation_id = concat!("list", stringify!($entity)),
            params(Paging), responses((status = StatusCode::OK, description = "List paginated, search matches name", body = Page<$entity>))))]
            pub async fn list(
                repository: EntityRepository,
                State(state): State<AppState>,
                Garde(Query(paging)): Garde<Query<Paging>>,
            ) -> ApiResult<impl IntoResponse> {
                let default_page_size = state.config().default_page_size;
                let page_size = paging.page_size(default_page_size);
                let search = paging.search().map(str::to_string);
                let listing_params = paging.into_listing_params(default_page_size)?;
                let batch = repository.list(listing_params, search.as_deref()).await?;
                Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
            }

            #[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = stringify!($entity), operation_id = concat!("create", stringify!($entity)),
            request_body = CreateEntity,
            responses((status = StatusCode::CREATED, description = concat!("Created ", stringify!($entity)), body = $entity))))]
            pub async fn create(
                CatalogAccess(actor): CatalogAccess,
                repository: EntityRepository,
                Garde(Json(payload)): Garde<Json<CreateEntity>>,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.create(payload).await?;
                debug!("{} created {}", actor.username(), record.slug);
                Ok((StatusCode::CREATED, Json(record)))
            }

            #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{slug}", tag = stringify!($entity), operation_id = concat!("get", stringify!($entity)),
            responses((status = StatusCode::OK, description = "Get one", body = $entity))))]
            pub async fn get(
                Path(slug): Path<String>,
                repository: EntityRepository,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.get_by_slug(&slug).await?;
                Ok((StatusCode::OK, Json(record)))
            }

            #[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{slug}", tag = stringify!($entity), operation_id = concat!("delete", stringify!($entity)),
            responses((status = StatusCode::NO_CONTENT, description = "Deleted"))))]
            pub async fn delete(
                CatalogAccess(actor): CatalogAccess,
                Path(slug): Path<String>,
                repository: EntityRepository,
            ) -> ApiResult<impl IntoResponse> {
                repository.delete_by_slug(&slug).await?;
                debug!("{} deleted {}", actor.username(), slug);
                Ok((StatusCode::NO_CONTENT, ()))
            }

            #[cfg(feature = "openapi")]
            #[derive(utoipa::OpenApi)]
            #[openapi(paths(list, create, get, delete))]
            struct ApiDocs;

            #[cfg(feature = "openapi")]
            pub fn api_docs() -> utoipa::openapi::OpenApi {
                use utoipa::OpenApi as _;
                ApiDocs::openapi()
            }

            pub fn router() -> axum::Router<AppState> {
                use axum::routing::get as get_route;
                axum::Router::new()
                    .route("/", get_route(list).post(create))
                    .route("/{slug}", get_route(get).delete(delete))
            }
        }

        pub use slug_api::router;
        #[cfg(feature = "openapi")]
        pub use slug_api::api_docs;
    };
}
