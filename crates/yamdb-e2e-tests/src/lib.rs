pub mod rest;

use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;
use yamdb_app::state::AppState;
use yamdb_server::config::{Parser, ServerConfig};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "yamdb-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--mail-backend",
        "memory",
        "--default-page-size",
        "10",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir().join("yamdb-e2e-tests");
    tokio::fs::create_dir_all(&base_dir).await?;
    test_config(test_name, &base_dir)
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let url = Url::parse(&format!("http://127.0.0.1:{}/", config.port))?;
    Ok(url)
}

/// Starts server in background and waits until it is ready.
///
/// Returned state shares database pool and mailer with running server.
pub async fn spawn_server(args: ServerConfig) -> Result<AppState> {
    let state = yamdb_server::build_state(&args).await?;
    let health_url = base_url(&args)?.join("health")?;
    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = yamdb_server::run::run_graceful_with_state(
            args,
            server_state,
            std::future::pending(),
        )
        .await
        {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(state),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not start"))
}
