use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::headers::{
    PREFER, X_REQUESTED_WITH, X_WOPI_ITEM_VERSION, X_WOPI_LOCK, X_WOPI_LOCK_FAILURE_REASON,
    X_WOPI_MACHINE_NAME, X_WOPI_OLD_LOCK, X_WOPI_OVERRIDE, X_WOPI_SESSION_ID,
};
use crate::server::AppState;
use crate::{api, handler};

/// Build the axum router with the WOPI endpoints, plus the admin
/// endpoints when the config enables them.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let mut router = Router::new()
        .route("/", get(api::index))
        .route("/api/health", get(api::health));
    if state.config.admin_enabled() {
        router = router.merge(admin_routes());
    }
    router
        .route(
            "/wopi/files/:file_id",
            get(handler::check_file_info).post(handler::file_override),
        )
        .route(
            "/wopi/files/:file_id/contents",
            get(handler::get_file).post(handler::put_file),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// None of these check an access token.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/files", get(api::list_files))
        .route("/api/debug-file/:file_id", get(api::debug_file))
        .route("/api/clear-locks", post(api::clear_locks))
        .route("/api/reset-sample", post(api::reset_sample))
        .route("/api/generate-wopi-url", get(api::generate_wopi_url))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            X_REQUESTED_WITH,
            X_WOPI_OVERRIDE,
            X_WOPI_LOCK,
            X_WOPI_OLD_LOCK,
            X_WOPI_MACHINE_NAME,
            X_WOPI_SESSION_ID,
            X_WOPI_ITEM_VERSION,
            PREFER,
        ])
        .expose_headers([X_WOPI_LOCK, X_WOPI_ITEM_VERSION, X_WOPI_LOCK_FAILURE_REASON])
}
