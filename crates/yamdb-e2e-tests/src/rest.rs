use anyhow::{Result, anyhow};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::info;
use yamdb_app::state::AppState;
use yamdb_dal::{
    category::Category,
    genre::Genre,
    title::Title,
    user::{CreateUser, User, UserRepository},
};
use yamdb_types::{claim::Role, general::ValidEmail};

pub fn api_url(base_url: &Url, path: &str) -> Url {
    base_url
        .join("api/v1/")
        .and_then(|api| api.join(path))
        .expect("valid API path")
}

/// Last confirmation code mailed to given address
pub fn last_code(state: &AppState, email: &str) -> Option<String> {
    state
        .mailer()
        .sent()
        .into_iter()
        .rev()
        .find(|mail| mail.recipients.iter().any(|r| r == email))
        .and_then(|mail| {
            mail.body
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
        })
}

pub async fn create_user(state: &AppState, username: &str, role: Role) -> Result<User> {
    let repository = UserRepository::new(state.pool().clone());
    let user = repository
        .create(CreateUser {
            username: username.to_string(),
            email: ValidEmail::cheat(format!("{username}@example.com")),
            first_name: None,
            last_name: None,
            bio: None,
            role: Some(role),
            is_superuser: false,
        })
        .await?;
    Ok(user)
}

/// Signup and exchange of mailed code for access token
pub async fn obtain_token(
    client: &reqwest::Client,
    base_url: &Url,
    state: &AppState,
    username: &str,
    email: &str,
) -> Result<String> {
    let response = client
        .post(api_url(base_url, "auth/signup"))
        .json(&json!({"username": username, "email": email}))
        .send()
        .await?;
    info!("Signup response: {:#?}", response);
    if response.status() != StatusCode::OK {
        return Err(anyhow!("Signup failed: {}", response.status()));
    }
    let code = last_code(state, email).ok_or_else(|| anyhow!("No code mailed to {email}"))?;

    let response = client
        .post(api_url(base_url, "auth/token"))
        .json(&json!({"username": username, "confirmation_code": code}))
        .send()
        .await?;
    if response.status() != StatusCode::OK {
        return Err(anyhow!("Token request failed: {}", response.status()));
    }
    let body: Value = response.json().await?;
    body["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No token in response"))
}

/// Creates user with given role directly in database and logs in
pub async fn login_as(
    client: &reqwest::Client,
    base_url: &Url,
    state: &AppState,
    username: &str,
    role: Role,
) -> Result<String> {
    let user = create_user(state, username, role).await?;
    obtain_token(client, base_url, state, &user.username, &user.email).await
}

pub async fn create_category(
    client: &reqwest::Client,
    base_url: &Url,
    token: &str,
    name: &str,
    slug: &str,
) -> Result<Category> {
    let response = client
        .post(api_url(base_url, "categories"))
        .bearer_auth(token)
        .json(&json!({"name": name, "slug": slug}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(response.json().await?)
}

pub async fn create_genre(
    client: &reqwest::Client,
    base_url: &Url,
    token: &str,
    name: &str,
    slug: &str,
) -> Result<Genre> {
    let response = client
        .post(api_url(base_url, "genres"))
        .bearer_auth(token)
        .json(&json!({"name": name, "slug": slug}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(response.json().await?)
}

pub async fn create_title(
    client: &reqwest::Client,
    base_url: &Url,
    token: &str,
    payload: Value,
) -> Result<Title> {
    let response = client
        .post(api_url(base_url, "titles"))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await?;
    info!("Create title response: {:#?}", response);
    assert_eq!(response.status(), StatusCode::CREATED);
    Ok(response.json().await?)
}
