//! HTTP server for the B+ tree record store.
//!
//! Provides REST API endpoints for:
//! - CRUD operations on records
//! - Ordered scans and bulk loading
//! - Tree visualization export
//! - Configuration management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bplus_store::{Config, Db, DbStats, Key, StoreError, TreeConfig, TreeNode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Request to create a fresh store
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDbRequest {
    order: Option<usize>,
    log_path: Option<String>,
}

/// Request to change the configuration used by the next store
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigRequest {
    order: Option<usize>,
}

/// Request carrying one record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutRequest {
    key: Key,
    value: String,
}

/// Request carrying a replacement value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    value: String,
}

/// Request to bulk-load a file from the server's filesystem
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadRequest {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkInsertRequest {
    pairs: Vec<PutRequest>,
}

/// Response for find operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetResponse {
    key: Key,
    value: Option<String>,
    found: bool,
}

/// Response for operations that return success/failure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    success: bool,
    message: String,
}

/// One record of a scan
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordResponse {
    key: Key,
    value: String,
}

/// Tree visualization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeResponse {
    tree: Option<TreeNode>,
    stats: DbStats,
}

/// Mutable app state for store management
struct AppState {
    db: RwLock<Option<Db>>,
    config: RwLock<Config>,
}

impl AppState {
    fn new() -> Self {
        Self {
            db: RwLock::new(None),
            config: RwLock::new(Config::new()),
        }
    }
}

type SharedState = Arc<AppState>;
type ApiError = (StatusCode, Json<OperationResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn failure(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(OperationResponse {
            success: false,
            message: message.into(),
        }),
    )
}

fn success(message: impl Into<String>) -> Json<OperationResponse> {
    Json(OperationResponse {
        success: true,
        message: message.into(),
    })
}

/// Run a handler body against the open store
fn with_db<T>(state: &AppState, f: impl FnOnce(&Db) -> ApiResult<T>) -> ApiResult<T> {
    let db_lock = state.db.read();
    match &*db_lock {
        Some(db) => f(db),
        None => Err(failure(StatusCode::BAD_REQUEST, "No store open")),
    }
}

fn store_failure(action: &str, e: &StoreError) -> ApiError {
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    failure(status, format!("{} failed: {}", action, e))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bplus_store=debug,bplus_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/db", post(create_db).delete(close_db))
        .route("/api/config", get(get_config).post(set_config))
        .route("/api/kv", post(insert_value))
        .route(
            "/api/kv/:key",
            get(find_value).put(update_value).delete(delete_value),
        )
        .route("/api/keys", get(list_keys))
        .route("/api/scan", get(scan_records))
        .route("/api/tree", get(get_tree))
        .route("/api/stats", get(get_stats))
        .route("/api/clear", post(clear_db))
        .route("/api/bulk", post(bulk_insert))
        .route("/api/load", post(load_file))
        .layer(cors)
        .with_state(state);

    let addr = "0.0.0.0:3001";
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("B+ tree server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
    }
}

async fn create_db(
    State(state): State<SharedState>,
    Json(req): Json<CreateDbRequest>,
) -> ApiResult<OperationResponse> {
    let config = {
        let mut config = state.config.write();
        if let Some(order) = req.order {
            config.tree_config = TreeConfig::new(order);
        }
        if let Some(path) = req.log_path {
            config.log_path = Some(path.into());
        }
        config.clone()
    };

    match Db::open(config.clone()) {
        Ok(db) => {
            *state.db.write() = Some(db);
            Ok(success(format!(
                "Store opened with order {}",
                config.tree_config.order
            )))
        }
        Err(e) => Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to open store: {}", e),
        )),
    }
}

async fn close_db(State(state): State<SharedState>) -> Json<OperationResponse> {
    let mut db_lock = state.db.write();
    if db_lock.take().is_some() {
        success("Store closed")
    } else {
        Json(OperationResponse {
            success: false,
            message: "No store open".to_string(),
        })
    }
}

async fn get_config(State(state): State<SharedState>) -> Json<TreeConfig> {
    Json(state.config.read().tree_config)
}

async fn set_config(
    State(state): State<SharedState>,
    Json(req): Json<ConfigRequest>,
) -> Json<OperationResponse> {
    let mut config = state.config.write();
    apply_config(&mut config, &req);
    success(format!(
        "Config updated: order={} (applies to the next store)",
        config.tree_config.order
    ))
}

fn apply_config(config: &mut Config, req: &ConfigRequest) {
    if let Some(order) = req.order {
        config.tree_config = TreeConfig::new(order);
    }
}

async fn find_value(
    State(state): State<SharedState>,
    Path(key): Path<Key>,
) -> ApiResult<GetResponse> {
    with_db(&state, |db| match db.find(key) {
        Ok(value) => Ok(Json(GetResponse {
            key,
            value: Some(value),
            found: true,
        })),
        Err(e) if e.is_not_found() => Ok(Json(GetResponse {
            key,
            value: None,
            found: false,
        })),
        Err(e) => Err(store_failure("Find", &e)),
    })
}

async fn insert_value(
    State(state): State<SharedState>,
    Json(req): Json<PutRequest>,
) -> ApiResult<OperationResponse> {
    with_db(&state, |db| {
        db.insert(req.key, req.value);
        Ok(success(format!("Inserted key {}", req.key)))
    })
}

async fn update_value(
    State(state): State<SharedState>,
    Path(key): Path<Key>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<OperationResponse> {
    with_db(&state, |db| match db.update(key, req.value) {
        Ok(()) => Ok(success(format!("Updated key {}", key))),
        Err(e) => Err(store_failure("Update", &e)),
    })
}

async fn delete_value(
    State(state): State<SharedState>,
    Path(key): Path<Key>,
) -> ApiResult<OperationResponse> {
    with_db(&state, |db| match db.delete(key) {
        Ok(_) => Ok(success(format!("Deleted key {}", key))),
        Err(e) => Err(store_failure("Delete", &e)),
    })
}

async fn list_keys(State(state): State<SharedState>) -> ApiResult<Vec<Key>> {
    with_db(&state, |db| {
        Ok(Json(db.scan().into_iter().map(|(k, _)| k).collect()))
    })
}

async fn scan_records(State(state): State<SharedState>) -> ApiResult<Vec<RecordResponse>> {
    with_db(&state, |db| {
        Ok(Json(
            db.scan()
                .into_iter()
                .map(|(key, value)| RecordResponse { key, value })
                .collect(),
        ))
    })
}

async fn get_tree(State(state): State<SharedState>) -> ApiResult<TreeResponse> {
    with_db(&state, |db| {
        Ok(Json(TreeResponse {
            tree: db.export_tree(),
            stats: db.stats(),
        }))
    })
}

async fn get_stats(State(state): State<SharedState>) -> ApiResult<DbStats> {
    with_db(&state, |db| Ok(Json(db.stats())))
}

async fn clear_db(State(state): State<SharedState>) -> ApiResult<OperationResponse> {
    with_db(&state, |db| {
        db.clear();
        Ok(success("Store cleared"))
    })
}

async fn bulk_insert(
    State(state): State<SharedState>,
    Json(req): Json<BulkInsertRequest>,
) -> ApiResult<OperationResponse> {
    with_db(&state, |db| {
        let count = req.pairs.len();
        for pair in req.pairs {
            db.insert(pair.key, pair.value);
        }
        Ok(success(format!("Inserted {} key-value pairs", count)))
    })
}

async fn load_file(
    State(state): State<SharedState>,
    Json(req): Json<LoadRequest>,
) -> ApiResult<OperationResponse> {
    with_db(&state, |db| match db.load_file(&req.path) {
        Ok(report) => Ok(success(format!(
            "Loaded {} records ({} overwritten, {} skipped) in {} ms",
            report.inserted + report.overwritten,
            report.overwritten,
            report.skipped,
            report.elapsed.as_millis()
        ))),
        Err(e) => Err(store_failure("Load", &e)),
    })
}
