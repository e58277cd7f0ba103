/// Workflow instance read endpoints

use crate::{api::AppState, error::Error, instance::WorkflowInstance};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InstanceQuery {
    pub definition_id: Option<String>,
}

/// Create workflow instance routes
pub fn create_instance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflow-instances", get(list_instances))
        .route("/api/workflow-instances/{id}", get(get_instance))
}

/// GET /api/workflow-instances?definition_id=...
async fn list_instances(
    State(state): State<AppState>,
    Query(query): Query<InstanceQuery>,
) -> Result<Json<Vec<WorkflowInstance>>, Error> {
    Ok(Json(state.instances.list(query.definition_id.as_deref()).await?))
}

/// GET /api/workflow-instances/{id}
async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowInstance>, Error> {
    state
        .instances
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("workflow instance {}", id)))
}
