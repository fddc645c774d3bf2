use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::headings::{self, HeadingRecord, RenderedDocument};
use crate::metadata::{self, MetadataStore};
use crate::models::*;
use crate::resolver::{Navigation, Resolution, ResolveView};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation failures ("Invalid ...") are safe to expose and come back as
/// BAD_REQUEST; everything else is logged and hidden behind a generic 500.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.starts_with("Invalid") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Catalog
// ============================================================

pub async fn list_entities(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContentEntity>>, (StatusCode, String)> {
    state.db.get_all_entities().map(Json).map_err(internal_error)
}

pub async fn get_entity(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ContentEntity>, (StatusCode, String)> {
    state
        .db
        .get_entity(&slug)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Entity not found".to_string()))
}

pub async fn upsert_entity(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<UpsertEntityInput>,
) -> Result<Json<ContentEntity>, (StatusCode, String)> {
    state
        .db
        .upsert_entity(&slug, input)
        .map(Json)
        .map_err(internal_error)
}

pub async fn delete_entity(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.delete_entity(&slug).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Entity not found".to_string()))
    }
}

// ============================================================
// Resolution
// ============================================================

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session: Option<Uuid>,
}

/// Resolve a slug for the view layer.
///
/// Always answers with a [`ResolveView`]; the status code mirrors its state.
pub async fn resolve(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<SessionQuery>,
) -> (StatusCode, Json<ResolveView>) {
    let hint = match query.session {
        Some(session) => state.resolver.load_hint(session).await,
        None => None,
    };
    let nav = Navigation::new(slug).with_hint(hint);
    let outcome = state.resolver.resolve(&nav).await;

    let view = ResolveView::from_outcome(&nav, outcome);
    let status = match &view {
        ResolveView::Resolved { .. } => StatusCode::OK,
        ResolveView::NotFound { .. } => StatusCode::NOT_FOUND,
        ResolveView::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(view))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitResponse {
    pub cleared: bool,
}

/// Called by the view once a resolution of `slug` has rendered; clears the
/// session's hint when that resolution used it.
pub async fn commit_resolution(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<SessionQuery>,
    Json(resolution): Json<Resolution>,
) -> Result<Json<CommitResponse>, (StatusCode, String)> {
    let session = query.session.ok_or((
        StatusCode::BAD_REQUEST,
        "Missing session parameter".to_string(),
    ))?;
    tracing::debug!("Committing resolution of '{}' for session {}", slug, session);

    state
        .resolver
        .commit(session, &slug, &resolution)
        .await
        .map(|cleared| Json(CommitResponse { cleared }))
        .map_err(internal_error)
}

pub async fn get_hint(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<Json<ResolutionHint>, (StatusCode, String)> {
    state
        .db
        .get_hint(session)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Hint not found".to_string()))
}

pub async fn put_hint(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
    Json(hint): Json<ResolutionHint>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .db
        .set_hint(session, &hint)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal_error)
}

pub async fn delete_hint(
    State(state): State<AppState>,
    Path(session): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .db
        .delete_hint(session)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal_error)
}

// ============================================================
// Metadata
// ============================================================

/// Page defaults arrive as query parameters alongside the path.
#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    #[serde(default)]
    pub path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

pub async fn page_metadata(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Json<PageMetadata> {
    let page_default = MetadataLayer {
        title: query.title,
        description: query.description,
        keywords: query.keywords,
    };
    Json(metadata::page_metadata(&state.db, &state.site, &page_default, &query.path).await)
}

pub async fn list_overrides(
    State(state): State<AppState>,
) -> Result<Json<Vec<PathMetadata>>, (StatusCode, String)> {
    state.db.get_path_metadata().map(Json).map_err(internal_error)
}

pub async fn replace_overrides(
    State(state): State<AppState>,
    Json(overrides): Json<Vec<PathMetadata>>,
) -> Result<Json<Vec<PathMetadata>>, (StatusCode, String)> {
    state
        .db
        .save_overrides(overrides)
        .await
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Markdown
// ============================================================

pub async fn extract_headings(body: String) -> Json<Vec<HeadingRecord>> {
    Json(headings::extract_headings(&body))
}

pub async fn render_markdown(body: String) -> Json<RenderedDocument> {
    Json(headings::render_markdown(&body))
}
