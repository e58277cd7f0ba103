/// Descriptor listing endpoints
///
/// Read-only views over the descriptor registry snapshot and the variable
/// type catalog, plus an explicit refresh trigger.

use crate::{
    activity::descriptor::ActivityDescriptorModel,
    api::AppState,
    error::Error,
    types::variables::{list_variable_descriptors, VariableDescriptorModel},
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

/// Create descriptor routes
pub fn create_descriptor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/descriptors/activities", get(list_activity_descriptors))
        .route("/api/descriptors/activities/refresh", post(refresh_activity_descriptors))
        .route("/api/descriptors/variables", get(list_variable_types))
}

/// GET /api/descriptors/activities
async fn list_activity_descriptors(State(state): State<AppState>) -> Json<Vec<ActivityDescriptorModel>> {
    Json(state.registry.get_all().models())
}

/// Re-query every provider and swap in the new snapshot
///
/// POST /api/descriptors/activities/refresh
async fn refresh_activity_descriptors(State(state): State<AppState>) -> Result<Json<Value>, Error> {
    let snapshot = state.registry.refresh().await?;
    Ok(Json(json!({
        "generation": snapshot.generation(),
        "count": snapshot.len(),
    })))
}

/// GET /api/descriptors/variables
async fn list_variable_types(State(state): State<AppState>) -> Json<Vec<VariableDescriptorModel>> {
    Json(list_variable_descriptors(&state.aliases, &state.variables))
}
