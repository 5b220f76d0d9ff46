//! WOPI endpoint handlers.
//!
//! Every handler verifies the access token before looking at the store, so
//! an unauthorized caller learns nothing about which documents exist.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use wopi_types::{DocumentId, LockToken};

use crate::auth::Credentials;
use crate::error::{ServerError, ServerResult};
use crate::headers::{header_text, header_value, X_WOPI_ITEM_VERSION, X_WOPI_LOCK, X_WOPI_OLD_LOCK, X_WOPI_OVERRIDE};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccessQuery {
    pub access_token: Option<String>,
}

/// Parse the path id and check the caller's credential for it.
async fn authorize(
    state: &AppState,
    file_id: &str,
    query: &AccessQuery,
    headers: &HeaderMap,
) -> ServerResult<DocumentId> {
    let id = DocumentId::new(file_id)?;
    let credentials = Credentials::from_request(query.access_token.as_deref(), headers);
    if !state.verifier.verify(&credentials, &id).await {
        tracing::warn!(document = %id, "rejected access token");
        return Err(ServerError::Unauthorized);
    }
    Ok(id)
}

fn lock_header(headers: &HeaderMap) -> ServerResult<Option<LockToken>> {
    Ok(LockToken::parse_optional(header_text(headers, &X_WOPI_LOCK)?)?)
}

fn old_lock_header(headers: &HeaderMap) -> ServerResult<Option<LockToken>> {
    Ok(LockToken::parse_optional(header_text(headers, &X_WOPI_OLD_LOCK)?)?)
}

fn require_lock(headers: &HeaderMap) -> ServerResult<LockToken> {
    lock_header(headers)?.ok_or_else(|| ServerError::Validation("X-WOPI-Lock header is required".into()))
}

/// CheckFileInfo response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckFileInfo {
    pub base_file_name: String,
    pub owner_id: String,
    pub size: u64,
    pub user_id: String,
    pub user_friendly_name: String,
    pub version: String,
    #[serde(rename = "SHA256")]
    pub sha256: String,
    pub last_modified_time: String,
    pub user_can_write: bool,
    pub read_only: bool,
    pub user_can_not_write_relative: bool,
    pub supports_update: bool,
    pub supports_locks: bool,
    pub supports_get_lock: bool,
    pub supports_extended_lock_length: bool,
    pub supports_rename: bool,
    pub supports_delete_file: bool,
    pub supports_cobalt: bool,
    pub supports_put_relative_file: bool,
    pub supports_ecosystem: bool,
    pub supports_folders: bool,
    pub host_edit_url: String,
    pub host_view_url: String,
    pub breadcrumb_brand_name: String,
    pub breadcrumb_brand_url: String,
    pub breadcrumb_folder_name: String,
    pub breadcrumb_doc_name: String,
}

/// `GET /wopi/files/:file_id`
pub async fn check_file_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
) -> ServerResult<Json<CheckFileInfo>> {
    let id = authorize(&state, &file_id, &query, &headers).await?;
    let stat = state
        .coordinator
        .store()
        .stat(&id)?
        .ok_or_else(|| ServerError::NotFound(id.to_string()))?;

    let config = &state.config;
    let host_url = config.wopi_src(&id)?.to_string();
    Ok(Json(CheckFileInfo {
        base_file_name: id.to_string(),
        owner_id: config.auth.owner_id.clone(),
        size: stat.size,
        user_id: config.auth.user_id.clone(),
        user_friendly_name: config.auth.user_name.clone(),
        version: stat.version.to_string(),
        sha256: stat.digest.to_string(),
        last_modified_time: stat.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        user_can_write: true,
        read_only: false,
        user_can_not_write_relative: true,
        supports_update: true,
        supports_locks: true,
        supports_get_lock: true,
        supports_extended_lock_length: true,
        supports_rename: false,
        supports_delete_file: false,
        supports_cobalt: false,
        supports_put_relative_file: false,
        supports_ecosystem: false,
        supports_folders: false,
        host_edit_url: host_url.clone(),
        host_view_url: host_url,
        breadcrumb_brand_name: "WOPI Host".into(),
        breadcrumb_brand_url: config.public_base.clone(),
        breadcrumb_folder_name: "files".into(),
        breadcrumb_doc_name: id.to_string(),
    }))
}

/// `GET /wopi/files/:file_id/contents`
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let id = authorize(&state, &file_id, &query, &headers).await?;
    let content = state
        .coordinator
        .store()
        .read(&id)?
        .ok_or_else(|| ServerError::NotFound(id.to_string()))?;
    Ok(([(CONTENT_TYPE, content_type(&id))], content).into_response())
}

/// `POST /wopi/files/:file_id/contents`
///
/// A save is admitted when the document is unlocked or when either
/// `X-WOPI-Lock` or `X-WOPI-OldLock` matches the current lock. Writing a
/// document that does not exist yet creates it.
pub async fn put_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let id = authorize(&state, &file_id, &query, &headers).await?;
    let token = lock_header(&headers)?;
    let prior = old_lock_header(&headers)?;

    let receipt = state
        .coordinator
        .guarded_write(&id, &body, token.as_ref(), prior.as_ref())?;

    let lock = receipt.lock.as_ref().map(LockToken::as_str).unwrap_or("");
    let mut reply = HeaderMap::new();
    reply.insert(X_WOPI_ITEM_VERSION, header_value(receipt.version.as_str())?);
    reply.insert(X_WOPI_LOCK, header_value(lock)?);
    Ok((StatusCode::OK, reply).into_response())
}

/// `POST /wopi/files/:file_id` dispatched on `X-WOPI-Override`.
pub async fn file_override(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let id = authorize(&state, &file_id, &query, &headers).await?;
    let verb = header_text(&headers, &X_WOPI_OVERRIDE)?
        .unwrap_or("")
        .trim()
        .to_ascii_uppercase();
    let coordinator = &state.coordinator;

    match verb.as_str() {
        "LOCK" => {
            let token = require_lock(&headers)?;
            match old_lock_header(&headers)? {
                Some(old) => coordinator.relock(&id, &old, &token)?,
                None => coordinator.acquire(&id, &token)?,
            }
            Ok(StatusCode::OK.into_response())
        }
        "UNLOCK" => {
            coordinator.release(&id, &require_lock(&headers)?)?;
            Ok(StatusCode::OK.into_response())
        }
        "REFRESH_LOCK" => {
            coordinator.refresh(&id, &require_lock(&headers)?)?;
            Ok(StatusCode::OK.into_response())
        }
        "GET_LOCK" => {
            let current = coordinator.inspect(&id)?;
            let lock = current.as_ref().map(LockToken::as_str).unwrap_or("");
            let mut reply = HeaderMap::new();
            reply.insert(X_WOPI_LOCK, header_value(lock)?);
            Ok((StatusCode::OK, reply).into_response())
        }
        "PUT_RELATIVE" => Err(ServerError::NotImplemented("PutRelativeFile".into())),
        _ => Err(ServerError::UnknownOverride(verb)),
    }
}

fn content_type(id: &DocumentId) -> &'static str {
    let ext = id
        .as_str()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
