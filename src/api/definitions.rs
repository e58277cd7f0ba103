/// Activity definition REST API endpoints
///
/// Save/publish goes through the definition manager; a publish also refreshes
/// the descriptor registry before the response is returned.

use crate::{
    api::AppState,
    client::{SaveDefinitionRequest, SaveDefinitionResponse},
    definition::types::{ActivityDefinition, DefinitionSummary, VersionOptions},
    error::Error,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Query string of the single-definition lookup
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    /// "latest" (default), "published", or a version number
    pub version: Option<String>,
}

/// Create activity definition routes
pub fn create_definition_routes() -> Router<AppState> {
    Router::new()
        .route("/api/activity-definitions", post(save_definition).get(list_definitions))
        .route(
            "/api/activity-definitions/{definition_id}",
            get(get_definition).delete(delete_definition),
        )
        .route("/api/activity-definitions/{definition_id}/versions", get(list_versions))
}

/// Save (and optionally publish) a definition
///
/// POST /api/activity-definitions
/// Body: { "definition": { ... }, "publish": true }
/// Returns: the stored definition with server-assigned identity, plus
/// "refreshError" when the post-publish descriptor refresh failed
async fn save_definition(
    State(state): State<AppState>,
    Json(request): Json<SaveDefinitionRequest>,
) -> Result<Json<SaveDefinitionResponse>, Error> {
    let outcome = state.manager.save(request.definition, request.publish).await?;
    Ok(Json(outcome.into()))
}

/// List the latest version of every definition
///
/// GET /api/activity-definitions
async fn list_definitions(State(state): State<AppState>) -> Result<Json<Value>, Error> {
    let definitions = state.manager.list().await?;
    Ok(Json(json!({ "items": definitions })))
}

/// Get one version of a definition
///
/// GET /api/activity-definitions/{definition_id}?version=latest|published|N
async fn get_definition(
    State(state): State<AppState>,
    Path(definition_id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<ActivityDefinition>, Error> {
    let options = match query.version {
        Some(version) => version.parse::<VersionOptions>()?,
        None => VersionOptions::Latest,
    };
    Ok(Json(state.manager.get(&definition_id, options).await?))
}

/// Version history of a definition, newest first
///
/// GET /api/activity-definitions/{definition_id}/versions
async fn list_versions(
    State(state): State<AppState>,
    Path(definition_id): Path<String>,
) -> Result<Json<Vec<DefinitionSummary>>, Error> {
    Ok(Json(state.manager.versions(&definition_id).await?))
}

/// Delete every version of a definition
///
/// DELETE /api/activity-definitions/{definition_id}
async fn delete_definition(
    State(state): State<AppState>,
    Path(definition_id): Path<String>,
) -> Result<StatusCode, Error> {
    state.manager.delete(&definition_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
