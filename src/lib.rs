pub mod api;
pub mod backend;
pub mod config;
pub mod logic;
pub mod model;
pub mod resources;
pub mod seed;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use backend::{BackendGraphClient, InMemoryGraph, RecordingBackend};
pub use logic::{Expander, ObjectResolver, ResponseAccumulator};
pub use model::*;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use crate::api::handlers::GatewayState;
use crate::config::AppConfig;

/// Backend used by the server binary.
pub type GatewayBackend = RecordingBackend<InMemoryGraph>;

/// The configured fixture, or the demo inventory when none is set.
pub fn build_backend(config: &AppConfig) -> anyhow::Result<GatewayBackend> {
    let graph = match &config.backend.fixture_path {
        Some(path) => {
            log::info!("Loading inventory fixture from {}", path);
            InMemoryGraph::load(path)?
        }
        None => seed::demo_inventory(&config.backend.inventory_root),
    };
    log::info!("Inventory holds {} object(s)", graph.object_count());
    Ok(RecordingBackend::new(graph).with_logging(config.backend.log_calls))
}

/// Router with state and the request timeout applied.
pub fn build_app<B>(backend: B, config: &AppConfig) -> Router
where
    B: BackendGraphClient + 'static,
{
    let state = Arc::new(GatewayState::new(
        backend,
        config.backend.inventory_root.clone(),
        config.expand.max_levels,
    ));
    routes::create_router::<B>()
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TimeoutLayer::new(config.expand.request_timeout())))
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::load()?;
    let app = build_app(build_backend(&config)?, &config);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
