use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::backend::BackendGraphClient;

pub fn create_router<B: BackendGraphClient + 'static>() -> Router<AppState<B>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Inventory collections and resources, navigated by URI
        .route("/redfish/v1/*path", get(handlers::get_inventory_resource::<B>))
}
