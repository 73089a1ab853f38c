use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing_test::traced_test;
use yamdb_e2e_tests::{
    base_url, prepare_env,
    rest::{api_url, last_code, obtain_token},
    spawn_server,
};

#[tokio::test]
#[traced_test]
async fn test_signup_and_token() {
    let (args, _config_guard) = prepare_env("test_signup").await.unwrap();
    let base_url = base_url(&args).unwrap();
    let state = spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();

    let signup = json!({"username": "frodo", "email": "frodo@example.com"});
    let response = client
        .post(api_url(&base_url, "auth/signup"))
        .json(&signup)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, signup);

    let mails = state.mailer().sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].recipients, vec!["frodo@example.com".to_string()]);
    let code = last_code(&state, "frodo@example.com").unwrap();

    let response = client
        .post(api_url(&base_url, "auth/token"))
        .json(&json!({"username": "frodo", "confirmation_code": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["errors"].is_string());

    let response = client
        .post(api_url(&base_url, "auth/token"))
        .json(&json!({"username": "sam", "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(api_url(&base_url, "auth/token"))
        .json(&json!({"username": "frodo", "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // code is consumed
    let response = client
        .post(api_url(&base_url, "auth/token"))
        .json(&json!({"username": "frodo", "confirmation_code": code}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(api_url(&base_url, "users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["username"], "frodo");
    assert_eq!(me["role"], "user");

    // repeated signup sends new code to the same user
    let token = obtain_token(&client, &base_url, &state, "frodo", "frodo@example.com")
        .await
        .unwrap();
    assert!(!token.is_empty());
    assert_eq!(state.mailer().sent().len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_signup_rejected() {
    let (args, _config_guard) = prepare_env("test_signup_rejected").await.unwrap();
    let base_url = base_url(&args).unwrap();
    let state = spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();
    let url = api_url(&base_url, "auth/signup");

    for username in ["me", "ME", "Me"] {
        let response = client
            .post(url.clone())
            .json(&json!({"username": username, "email": "me@example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["username"].is_array(), "{body}");
    }

    let response = client
        .post(url.clone())
        .json(&json!({"username": "pippin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["email"].is_array());

    let response = client
        .post(url.clone())
        .json(&json!({"username": "pippin", "email": "pippin@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // same username with other email and other username with same email
    for payload in [
        json!({"username": "pippin", "email": "took@example.com"}),
        json!({"username": "took", "email": "pippin@example.com"}),
    ] {
        let response = client.post(url.clone()).json(&payload).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(state.mailer().sent().len(), 1);

    let response = client
        .get(api_url(&base_url, "users/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
