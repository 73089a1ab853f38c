use crate::config::ServerConfig;
use crate::error::Result;
use axum::{http::StatusCode, middleware, response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use tower::Layer as _;
use tower_http::{normalize_path::NormalizePathLayer, trace::TraceLayer};
use tracing::info;
use yamdb_app::{
    auth::{auth_router, token::check_token},
    rest_api::api_router,
    state::AppState,
};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = crate::build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut router = main_router(state);

    if !args.no_cors {
        router = router.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

#[cfg(feature = "openapi")]
fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::openapi::Components;

    #[derive(utoipa::OpenApi)]
    #[openapi(
        info(title = "YaMDb API", description = "Reviews and ratings of creative works"),
        modifiers(&SecurityAddon),
        security(("bearer" = []))
    )]
    struct OpenApi;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            openapi
                .components
                .get_or_insert_with(Components::new)
                .add_security_scheme(
                    "bearer",
                    SecurityScheme::Http(
                        HttpBuilder::new()
                            .scheme(HttpAuthScheme::Bearer)
                            .bearer_format("JWT")
                            .build(),
                    ),
                );
        }
    }

    use utoipa::OpenApi as _;
    OpenApi::openapi()
        .nest("/api/v1", yamdb_app::rest_api::api_docs())
        .nest("/api/v1/auth", yamdb_app::auth::api_docs())
}

pub fn main_router(state: AppState) -> Router<()> {
    let api = api_router()
        .nest("/auth", auth_router())
        .layer(middleware::from_fn_with_state(state.clone(), check_token))
        .with_state(state);
    // API paths are normalized before routing, so trailing slash is optional
    let api = NormalizePathLayer::trim_trailing_slash().layer(api);

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest_service("/api/v1", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    #[cfg(feature = "openapi")]
    {
        let docs = api_docs();
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs),
        );
    }
    router
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
