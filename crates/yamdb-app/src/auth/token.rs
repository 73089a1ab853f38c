use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;
use tracing::debug;
use yamdb_types::claim::ApiClaim;

use crate::{
    error::ApiError,
    policy::{self, Action, Scope},
    state::AppState,
};

fn validate(state: &AppState, token: &str) -> Result<ApiClaim, ApiError> {
    state.tokens().validate::<ApiClaim>(token).map_err(|e| {
        debug!("Invalid token: {e}");
        ApiError::Unauthenticated("Given token not valid for any token type".to_string())
    })
}

/// Actor is optional - anonymous requests have no Authorization header,
/// but a present and invalid token is always rejected
impl OptionalFromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if let Some(claim) = parts.extensions.get::<ApiClaim>() {
            return Ok(Some(claim.clone()));
        }
        if !parts.headers.contains_key(http::header::AUTHORIZATION) {
            return Ok(None);
        }
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                debug!("Invalid authorization header: {e}");
                ApiError::Unauthenticated("Invalid authorization header".to_string())
            })?;
        validate(state, bearer.token()).map(Some)
    }
}

impl FromRequestParts<AppState> for ApiClaim {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        <ApiClaim as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state)
            .await?
            .ok_or_else(ApiError::unauthenticated)
    }
}

/// Middleware validating bearer token of every request, including safe methods.
///
/// Valid claim is kept in request extensions for extractors.
pub async fn check_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let actor =
        <ApiClaim as OptionalFromRequestParts<AppState>>::from_request_parts(&mut parts, &state)
            .await?;
    if let Some(actor) = actor {
        parts.extensions.insert(actor);
    }
    Ok(next.run(Request::from_parts(parts, body)).await)
}

async fn scoped_access(parts: &mut Parts, state: &AppState, scope: Scope) -> Result<ApiClaim, ApiError> {
    let actor = <ApiClaim as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state).await?;
    policy::check(actor.as_ref(), scope, Action::from(&parts.method), false)?;
    actor.ok_or_else(ApiError::unauthenticated)
}

/// Actor allowed to modify catalog (categories, genres, titles), checked before request body is read
pub struct CatalogAccess(pub ApiClaim);

impl FromRequestParts<AppState> for CatalogAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        scoped_access(parts, state, Scope::Catalog).await.map(CatalogAccess)
    }
}

/// Actor allowed to manage user accounts of others
pub struct AccountAccess(pub ApiClaim);

impl FromRequestParts<AppState> for AccountAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        scoped_access(parts, state, Scope::Account).await.map(AccountAccess)
    }
}
