use axum::{extract::State, response::IntoResponse, routing::post, Json};
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use yamdb_auth::code::generate_code;
use yamdb_dal::user::{SignupUser, UserRepository};
use yamdb_types::claim::ApiClaim;

use crate::{error::ApiResult, mail::Email, state::AppState, validate::Garde};

pub mod token;

const CODE_MAIL_SUBJECT: &str = "YaMDb confirmation code";

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenRequest {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 255))]
    #[serde(alias = "code")]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenResponse {
    pub token: String,
}

fn code_mail(state: &AppState, username: &str, email: &str, code: &str) -> Email {
    Email {
        subject: CODE_MAIL_SUBJECT.to_string(),
        body: format!("{username}, your confirmation code is:\n{code}\n"),
        from: state.config().mail_from.clone(),
        recipients: vec![email.to_string()],
    }
}

/// Registers user (or reuses existing one with the same username and email)
/// and mails a new confirmation code
#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/signup", tag = "Auth", operation_id = "signup",
    request_body = SignupUser,
    responses((status = StatusCode::OK, description = "Confirmation code sent", body = SignupResponse),
        (status = StatusCode::BAD_REQUEST, description = "Invalid or conflicting username/email"))))]
pub async fn signup(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<SignupUser>>,
) -> ApiResult<impl IntoResponse> {
    let code = generate_code();
    let user = repository.register(payload, &code).await?;
    debug!("Issued confirmation code for {}", user.username);
    state
        .mailer()
        .dispatch(code_mail(&state, &user.username, &user.email, &code));

    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Exchanges confirmation code for access token, code can be used only once
#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/token", tag = "Auth", operation_id = "token",
    request_body = TokenRequest,
    responses((status = StatusCode::OK, description = "Access token", body = TokenResponse),
        (status = StatusCode::BAD_REQUEST, description = "Invalid confirmation code"),
        (status = StatusCode::NOT_FOUND, description = "Unknown user"))))]
pub async fn token(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<TokenRequest>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository
        .check_confirmation_code(&payload.username, &payload.confirmation_code)
        .await?;
    let claim = ApiClaim::new_expired(user.id, &user.username, user.effective_role());
    let token = state.tokens().issue(claim)?;
    debug!("Issued token for {}", user.username);

    Ok((StatusCode::OK, Json(TokenResponse { token })))
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(paths(signup, token))]
struct ModuleDocs;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    ModuleDocs::openapi()
}

/// Builds authentication router - must be nested on /auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(token))
}
