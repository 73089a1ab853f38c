use crate::{
    auth::token::AccountAccess,
    error::ApiResult,
    policy::{authorize_target, Action, Scope},
    repository_from_request,
    rest_api::{Page, Paging},
    validate::{Deferred, Garde},
};
use yamdb_dal::user::{CreateUser, UpdateUser, UserRepository};
#[cfg(feature = "openapi")]
use yamdb_dal::user::User;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::{Method, StatusCode};
use tracing::debug;
use yamdb_types::claim::{ApiClaim, Authorization as _, Role};

use crate::state::AppState;

repository_from_request!(UserRepository);

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(list_users, create_user, get_me, update_me, get_user, update_user, delete_user))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

/// Only admins can change roles, others have role silently kept
fn restrict_payload(actor: &ApiClaim, mut payload: UpdateUser) -> UpdateUser {
    if !actor.has_at_least(Role::Admin) {
        payload.role = None;
    }
    payload
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Users", operation_id = "listUsers",
    params(Paging), responses((status = StatusCode::OK, description = "List users, search matches username", body = Page<User>))))]
pub async fn list_users(
    AccountAccess(_actor): AccountAccess,
    user_registry: UserRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let search = paging.search().map(str::to_string);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = user_registry.list(listing_params, search.as_deref()).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

#[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Users", operation_id = "createUser",
    request_body = CreateUser,
    responses((status = StatusCode::CREATED, description = "Create new User", body = User))))]
pub async fn create_user(
    AccountAccess(actor): AccountAccess,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.create(payload).await?;
    debug!("{} created user {}", actor.username(), user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/me", tag = "Users", operation_id = "getMe",
    responses((status = StatusCode::OK, description = "Own profile", body = User))))]
pub async fn get_me(actor: ApiClaim, user_registry: UserRepository) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get(actor.uid).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/me", tag = "Users", operation_id = "updateMe",
    request_body = UpdateUser,
    responses((status = StatusCode::OK, description = "Updated own profile", body = User))))]
pub async fn update_me(
    actor: ApiClaim,
    user_registry: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let payload = restrict_payload(&actor, payload);
    let user = user_registry.update(actor.uid, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{username}", tag = "Users", operation_id = "getUser",
    responses((status = StatusCode::OK, description = "User profile", body = User))))]
pub async fn get_user(
    actor: ApiClaim,
    method: Method,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = authorize_target(
        &actor,
        Scope::Account,
        Action::from(&method),
        user_registry.get_by_username(&username),
        |user| user.id,
    )
    .await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/{username}", tag = "Users", operation_id = "updateUser",
    request_body = UpdateUser,
    responses((status = StatusCode::OK, description = "Updated user", body = User))))]
pub async fn update_user(
    actor: ApiClaim,
    method: Method,
    Path(username): Path<String>,
    user_registry: UserRepository,
    payload: Deferred<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    let user = authorize_target(
        &actor,
        Scope::Account,
        Action::from(&method),
        user_registry.get_by_username(&username),
        |user| user.id,
    )
    .await?;
    let payload = payload.into_valid()?;
    let payload = restrict_payload(&actor, payload);
    let user = user_registry.update(user.id, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{username}", tag = "Users", operation_id = "deleteUser",
    responses((status = StatusCode::NO_CONTENT, description = "Deleted with all reviews and comments"))))]
pub async fn delete_user(
    AccountAccess(actor): AccountAccess,
    Path(username): Path<String>,
    user_registry: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = user_registry.get_by_username(&username).await?;
    user_registry.delete(user.id).await?;
    debug!("{} deleted user {username}", actor.username());

    Ok((StatusCode::NO_CONTENT, ()))
}

/// Users router, `/me` is matched before `/{username}`
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).put(update_me).patch(update_me))
        .route(
            "/{username}",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
}
