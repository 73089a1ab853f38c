use std::time::Duration;

use axum::{body::Body, Router};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt as _;
use yamdb_app::{
    auth::{auth_router, token::check_token},
    mail::Mailer,
    rest_api::api_router,
    state::{AppConfig, AppState},
};
use yamdb_auth::token::TokenManager;
use yamdb_dal::{
    comment::{CommentRepository, CreateComment},
    review::{CreateReview, ReviewRepository},
    title::{CreateTitle, TitleRepository},
    user::{CreateUser, UserRepository},
};
use yamdb_types::{
    claim::{ApiClaim, Role},
    general::ValidEmail,
};

async fn test_app() -> (Router, AppState) {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(
            "sqlite::memory:"
                .parse::<sqlx::sqlite::SqliteConnectOptions>()
                .unwrap()
                .foreign_keys(true),
        )
        .await
        .unwrap();
    yamdb_dal::migrate(&pool).await.unwrap();
    let tokens = TokenManager::new(b"0123456789abcdef0123456789abcdef", Duration::from_secs(3600));
    let state = AppState::new(AppConfig::default(), pool, tokens, Mailer::memory());
    let router = api_router()
        .nest("/auth", auth_router())
        .layer(axum::middleware::from_fn_with_state(state.clone(), check_token))
        .with_state(state.clone());
    (router, state)
}

async fn token_for(state: &AppState, username: &str, role: Role) -> String {
    let user = UserRepository::new(state.pool().clone())
        .create(CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com").parse::<ValidEmail>().unwrap(),
            first_name: None,
            last_name: None,
            bio: None,
            role: Some(role),
            is_superuser: false,
        })
        .await
        .unwrap();
    state
        .tokens()
        .issue(ApiClaim::new_expired(user.id, &user.username, user.effective_role()))
        .unwrap()
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_unauthenticated_delete_keeps_title() {
    let (router, state) = test_app().await;
    let title = TitleRepository::new(state.pool().clone())
        .create(CreateTitle {
            name: "Solaris".to_string(),
            year: Some(1961),
            description: None,
            category: None,
            genre: vec![],
        })
        .await
        .unwrap();
    let uri = format!("/titles/{}", title.id);

    let (status, body) = send(&router, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, body) = send(&router, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Solaris");

    let (status, _) = send(&router, "DELETE", "/titles/9999", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // invalid token is refused even for safe methods
    let (status, body) = send(&router, "GET", &uri, Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token not valid for any token type");
}

#[tokio::test]
async fn test_catalog_requires_admin() {
    let (router, state) = test_app().await;
    let user = token_for(&state, "bob", Role::User).await;
    let admin = token_for(&state, "root", Role::Admin).await;
    let payload = json!({"name": "Books", "slug": "books"});

    let (status, body) = send(&router, "POST", "/categories", Some(&user), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "You do not have permission to perform this action."
    );

    // permission is checked before payload
    let (status, _) = send(&router, "POST", "/categories", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&router, "POST", "/categories", Some(&admin), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"name": "Books", "slug": "books"}));

    let (status, body) = send(&router, "POST", "/genres", Some(&admin), Some(json!({"name": "Drama"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["slug"][0], "This field is required.");

    let (status, body) = send(&router, "GET", "/categories/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Books");
}

#[tokio::test]
async fn test_signup_flow() {
    let (router, state) = test_app().await;
    let (status, _) = send(
        &router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({"username": "frodo", "email": "frodo@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mail = state.mailer().sent().pop().unwrap();
    let code = mail.body.lines().last().unwrap().trim().to_string();
    let (status, body) = send(
        &router,
        "POST",
        "/auth/token",
        None,
        Some(json!({"username": "frodo", "confirmation_code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let claim: ApiClaim = state.tokens().validate(token).unwrap();
    assert_eq!(claim.username(), "frodo");
    assert_eq!(claim.role, Role::User);

    let (status, body) = send(&router, "GET", "/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "frodo@example.com");
}

#[tokio::test]
async fn test_foreign_update_forbidden_regardless_of_payload() {
    let (router, state) = test_app().await;
    let owner = token_for(&state, "owner", Role::User).await;
    let other = token_for(&state, "other", Role::User).await;
    let owner_id = state.tokens().validate::<ApiClaim>(&owner).unwrap().uid;
    let pool = state.pool().clone();
    let title = TitleRepository::new(pool.clone())
        .create(CreateTitle {
            name: "Stalker".to_string(),
            year: Some(1979),
            description: None,
            category: None,
            genre: vec![],
        })
        .await
        .unwrap();
    let review = ReviewRepository::new(pool.clone())
        .create(
            title.id,
            owner_id,
            CreateReview {
                text: "Slow and great".to_string(),
                score: 9,
            },
        )
        .await
        .unwrap();
    let comment = CommentRepository::new(pool)
        .create(
            title.id,
            review.id,
            owner_id,
            CreateComment {
                text: "Agreed".to_string(),
            },
        )
        .await
        .unwrap();
    let review_uri = format!("/titles/{}/reviews/{}", title.id, review.id);
    let comment_uri = format!("{review_uri}/comments/{}", comment.id);
    let missing_uri = format!("/titles/{}/reviews/999", title.id);

    let forbidden = [
        ("PATCH", review_uri.as_str(), json!({"score": 5})),
        ("PATCH", review_uri.as_str(), json!({"score": 0})),
        ("PUT", review_uri.as_str(), json!("not an object")),
        ("PATCH", missing_uri.as_str(), json!({"score": 0})),
        ("PATCH", comment_uri.as_str(), json!({"text": ""})),
        ("PATCH", "/users/owner", json!({"username": "me"})),
    ];
    for (method, uri, payload) in forbidden {
        let (status, body) = send(&router, method, uri, Some(&other), Some(payload)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert!(body["detail"].is_string());
    }

    // the author still gets field errors
    let (status, body) = send(&router, "PATCH", &review_uri, Some(&owner), Some(json!({"score": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["score"].is_array());

    let (status, body) = send(&router, "PATCH", &review_uri, Some(&owner), Some(json!({"score": 6}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 6);
}

#[tokio::test]
async fn test_invalid_title_filter() {
    let (router, state) = test_app().await;
    TitleRepository::new(state.pool().clone())
        .create(CreateTitle {
            name: "Mirror".to_string(),
            year: Some(1975),
            description: None,
            category: None,
            genre: vec![],
        })
        .await
        .unwrap();
    let (status, body) = send(&router, "GET", "/titles?year=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].is_string());

    let (status, body) = send(&router, "GET", "/titles?year=1975", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}
