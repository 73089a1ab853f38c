mod macros;
mod paging;

pub mod category;
pub mod comment;
pub mod genre;
pub mod review;
pub mod title;

pub use paging::{Page, Paging};

use crate::state::AppState;

/// Resources served under API prefix, authentication endpoints are nested separately
pub fn api_router() -> axum::Router<AppState> {
    axum::Router::new()
        .nest("/users", crate::user::router())
        .nest("/categories", category::router())
        .nest("/genres", genre::router())
        .nest("/titles", title::router())
        .merge(review::router())
        .merge(comment::router())
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    utoipa::openapi::OpenApiBuilder::new()
        .build()
        .nest("/users", crate::user::api_docs())
        .nest("/categories", category::api_docs())
        .nest("/genres", genre::api_docs())
        .nest("/titles", title::api_docs())
        .merge_from(review::api_docs())
        .merge_from(comment::api_docs())
}
