use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::expand_query::ExpandParams;
use crate::backend::BackendGraphClient;
use crate::logic::{Expander, ResponseAccumulator};
use crate::model::{ExpansionError, ExpansionRequest, OutputAddress, SingleRequest};
use crate::resources::{self, Target};

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct GatewayState<B> {
    pub backend: B,
    pub inventory_root: String,
    pub max_levels: u8,
}

impl<B> GatewayState<B> {
    pub fn new(backend: B, inventory_root: impl Into<String>, max_levels: u8) -> Self {
        Self {
            backend,
            inventory_root: inventory_root.into(),
            max_levels,
        }
    }
}

pub type AppState<B> = Arc<GatewayState<B>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "MessageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            message_id: None,
        }
    }
}

impl From<&ExpansionError> for ErrorResponse {
    fn from(err: &ExpansionError) -> Self {
        Self {
            error: err.to_string(),
            message_id: Some(err.message_id().to_string()),
        }
    }
}

/// Status for an error that failed the whole request. Member-level failures
/// never reach this point; they are carried in the document.
pub fn status_for(err: &ExpansionError) -> StatusCode {
    match err {
        ExpansionError::NotFound { .. } => StatusCode::NOT_FOUND,
        ExpansionError::BackendUnavailable(_)
        | ExpansionError::MalformedProperty { .. }
        | ExpansionError::InvalidObjectPath(_)
        | ExpansionError::UnreservedAddress(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &ExpansionError) -> (StatusCode, Json<ErrorResponse>) {
    (status_for(err), Json(ErrorResponse::from(err)))
}

/// Serves any collection or resource below the top-level inventory
/// collections, expanded to the requested `$expand` depth.
pub async fn get_inventory_resource<B>(
    State(state): State<AppState<B>>,
    Path(path): Path<String>,
    expand: ExpandParams,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)>
where
    B: BackendGraphClient + 'static,
{
    let uri = format!("/redfish/v1/{}", path.trim_matches('/'));
    let depth = expand.clamped(state.max_levels).levels;

    let target = resources::locate(&state.backend, &state.inventory_root, &uri)
        .await
        .map_err(|e| error_response(&e))?;

    let (accumulator, receiver) = ResponseAccumulator::new(json!({}));
    log::debug!("request {}: {} at depth {}", accumulator.request_id(), uri, depth);

    let expander = Expander::new(&state.backend, &accumulator, &state.inventory_root);
    let result = match target {
        Target::Collection { scope, header, family } => {
            let request = ExpansionRequest::new(scope, depth, OutputAddress::root(), header);
            expander.expand_collection(request, family).await
        }
        Target::Single { scope, id, parent, family } => {
            let request = SingleRequest {
                scope,
                id,
                depth_budget: depth,
                output: OutputAddress::root(),
                parent,
            };
            expander.expand_single(request, family).await
        }
    };
    drop(expander);
    drop(accumulator);

    let completed = receiver.await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("response was abandoned before completion")),
        )
    })?;

    if let Err(e) = result {
        log::warn!("request {}: {} failed: {}", completed.request_id, uri, e);
        return Err(error_response(&e));
    }
    if !completed.errors.is_empty() {
        log::warn!(
            "request {}: {} completed with {} isolated error(s)",
            completed.request_id,
            uri,
            completed.errors.len()
        );
    }

    Ok(Json(completed.document))
}
