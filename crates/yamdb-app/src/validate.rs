use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    Json,
};
use garde::Validate;
use http::request::Parts;
use serde::de::DeserializeOwned;
use std::{convert::Infallible, ops::Deref};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Extractor wrapper validating extracted payload with `garde`.
///
/// Both rejection of inner extractor and validation report end up as [`ApiError`],
/// so malformed body and invalid fields share the same 400 response shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

fn checked<E, T>(inner: E) -> Result<Garde<E>, ApiError>
where
    E: Deref<Target = T>,
    T: Validate<Context = ()>,
{
    inner.validate()?;
    Ok(Garde(inner))
}

impl<Extractor, T> FromRequest<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequest<AppState>,
    <Extractor as FromRequest<AppState>>::Rejection: Into<ApiError>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state).await.map_err(Into::into)?;
        checked(inner)
    }
}

impl<Extractor, T> FromRequestParts<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequestParts<AppState>,
    <Extractor as FromRequestParts<AppState>>::Rejection: Into<ApiError>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state)
            .await
            .map_err(Into::into)?;
        checked(inner)
    }
}

/// JSON payload whose parse and validation errors are reported only when asked for.
///
/// Handlers that must authorize against a stored object first use this instead of
/// `Garde<Json<T>>`, so an actor without access never learns about payload errors.
#[derive(Debug)]
pub struct Deferred<T>(ApiResult<T>);

impl<T: Validate<Context = ()>> Deferred<T> {
    pub fn into_valid(self) -> ApiResult<T> {
        let payload = self.0?;
        payload.validate()?;
        Ok(payload)
    }
}

impl<T> FromRequest<AppState> for Deferred<T>
where
    T: DeserializeOwned,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let payload = Json::<T>::from_request(req, state)
            .await
            .map(|Json(payload)| payload)
            .map_err(ApiError::from);
        Ok(Deferred(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, Validate)]
    struct Named {
        #[garde(length(min = 1, max = 5))]
        name: String,
    }

    #[test]
    fn test_checked() {
        let ok = checked(Json(Named { name: "abc".into() }));
        assert!(ok.is_ok());
        let res = checked(Json(Named { name: "abcdefgh".into() }));
        assert!(matches!(res, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_deferred() {
        let valid = Deferred(Ok(Named { name: "abc".into() })).into_valid();
        assert_eq!(valid.unwrap().name, "abc");
        let res = Deferred(Ok(Named { name: String::new() })).into_valid();
        assert!(matches!(res, Err(ApiError::Validation(_))));
        let res = Deferred::<Named>(Err(ApiError::BadRequest("broken".into()))).into_valid();
        assert!(matches!(res, Err(ApiError::BadRequest(_))));
    }
}
