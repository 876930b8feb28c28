//! Tenant backup endpoints.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Manager;
use crate::backup::{dump_store, resolve_backup_file, restore_store};
use crate::error::ApiError;
use crate::routes::ok;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_backup))
        .route("/restore", post(restore_backup))
}

#[derive(Debug, Deserialize)]
struct RestorePayload {
    file: String,
}

async fn create_backup(
    manager: Manager,
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    let file = dump_store(&state.db, &state.config.backup_dir, manager.store_id).await?;
    Ok(ok(json!({ "file": file })))
}

async fn restore_backup(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<RestorePayload>,
) -> Result<Json<Value>, ApiError> {
    let path = resolve_backup_file(&state.config.backup_dir, &payload.file)?;
    let restored = restore_store(&state.db, &path, manager.store_id).await?;
    Ok(ok(json!({ "restored": restored })))
}
