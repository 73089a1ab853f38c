use reqwest::StatusCode;
use tracing_test::traced_test;
use yamdb_e2e_tests::{base_url, prepare_env, rest::api_url, spawn_server};

#[tokio::test]
#[traced_test]
async fn test_health_and_trailing_slash() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = base_url(&args).unwrap();
    spawn_server(args).await.unwrap();
    let client = reqwest::Client::new();

    let response = client.get(base_url.join("health").unwrap()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    for path in ["categories", "categories/", "titles/", "genres"] {
        let response = client.get(api_url(&base_url, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        let page: serde_json::Value = response.json().await.unwrap();
        assert_eq!(page["total"], 0);
        assert_eq!(page["page_size"], 10);
    }

    let response = client
        .get(api_url(&base_url, "titles?year=abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(api_url(&base_url, "genres?sort=-popularity"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
