//! Convenience and administrative endpoints used while wiring up an editor.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use wopi_types::{DocumentId, DocumentStat};

use crate::error::{ServerError, ServerResult};
use crate::sample::sample_docx;
use crate::server::AppState;

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let endpoints = if state.config.admin_enabled() {
        json!({
            "health": "/api/health",
            "files": "/api/files",
            "wopiUrl": "/api/generate-wopi-url",
            "debugFile": "/api/debug-file/:file_id",
            "clearLocks": "/api/clear-locks (POST)",
            "resetSample": "/api/reset-sample (POST)",
        })
    } else {
        json!({ "health": "/api/health" })
    };
    Json(json!({
        "name": "wopi-host",
        "version": env!("CARGO_PKG_VERSION"),
        "base": state.config.public_base,
        "endpoints": endpoints,
    }))
}

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub files: Vec<DocumentStat>,
    pub total: usize,
    /// Documents currently holding a lock.
    pub locked: Vec<DocumentId>,
}

/// `GET /api/files`
pub async fn list_files(State(state): State<AppState>) -> ServerResult<Json<FileListing>> {
    let files = state.coordinator.store().list()?;
    let locked = state
        .coordinator
        .table()
        .held()?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    Ok(Json(FileListing {
        total: files.len(),
        files,
        locked,
    }))
}

/// `GET /api/debug-file/:file_id`
pub async fn debug_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = DocumentId::new(file_id)?;
    let stat = state
        .coordinator
        .store()
        .stat(&id)?
        .ok_or_else(|| ServerError::NotFound(id.to_string()))?;
    let lock = state.coordinator.snapshot(&id)?;
    Ok(Json(json!({
        "fileId": stat.id,
        "size": stat.size,
        "version": stat.version,
        "lastModified": stat.last_modified,
        "sha256": stat.digest.short(),
        "locked": lock.is_some(),
        "lock": lock,
    })))
}

/// `POST /api/clear-locks`
pub async fn clear_locks(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let cleared = state.coordinator.clear_locks()?;
    tracing::info!(cleared, "cleared all locks");
    Ok(Json(json!({ "cleared": cleared, "message": format!("Cleared {cleared} locks") })))
}

/// `POST /api/reset-sample`
pub async fn reset_sample(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let id = state
        .sample_id()?
        .ok_or_else(|| ServerError::NotFound("no sample document configured".into()))?;
    let version = state.coordinator.reset_document(&id, &sample_docx()?)?;
    tracing::info!(document = %id, %version, "sample document reset");
    Ok(Json(json!({
        "fileId": id,
        "version": version,
        "message": "Sample file reset",
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchUrls {
    pub file_id: DocumentId,
    pub wopi_src: String,
    pub access_token: String,
    pub edit_url: String,
}

/// `GET /api/generate-wopi-url`: editor launch URLs for the sample
/// document. Tokens for anything else come from `wopi token`.
pub async fn generate_wopi_url(State(state): State<AppState>) -> ServerResult<Json<LaunchUrls>> {
    let id = state
        .sample_id()?
        .ok_or_else(|| ServerError::NotFound("no sample document configured".into()))?;
    if !state.coordinator.store().exists(&id)? {
        return Err(ServerError::NotFound(id.to_string()));
    }

    let config = &state.config;
    let access_token = state.signer.issue(&id, &config.auth.user_id);
    Ok(Json(LaunchUrls {
        wopi_src: config.wopi_src(&id)?.to_string(),
        edit_url: config.editor_launch_url(&id, &access_token)?.to_string(),
        access_token,
        file_id: id,
    }))
}
