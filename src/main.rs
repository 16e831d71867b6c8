use ats_backend::services::notification_service::NotificationService;
use ats_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware, routes, AppState,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool.clone());

    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let notifier =
                NotificationService::new(pool, get_config().email_gateway_url.clone());
            loop {
                match notifier.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Email outbox worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route(
            "/api/applications",
            post(routes::application_routes::submit_application)
                .get(routes::application_routes::list_applications),
        )
        .route(
            "/api/applications/:id",
            get(routes::application_routes::get_application),
        )
        .route(
            "/api/applications/:id/stage",
            put(routes::application_routes::update_application_stage),
        )
        .route(
            "/api/applications/:id/history",
            get(routes::application_routes::get_application_history),
        )
        .route(
            "/api/applications/:id/stages",
            get(routes::application_routes::get_valid_next_stages),
        )
        .route("/api/jobs", get(routes::job_routes::list_jobs))
        .route("/api/jobs/:id", get(routes::job_routes::get_job))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(config.api_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(api)
        .with_state(app_state)
        .layer(middleware::cors::permissive_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
